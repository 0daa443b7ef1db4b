//! Text rendering of an image next to the class probabilities predicted for it.

use crate::{
  scalar::Real,
  error::{ Error, Result },
  Tensor,
};


const SHADES: &[u8] = b" .:-=+*#%@";
const BAR_WIDTH: usize = 30;

/// Render a square grayscale image as ASCII shading, followed by
/// a horizontal bar per class probability.
///
/// The image may have any shape with a square number of elements,
/// like `[1, 28, 28]` or `[784]`. Intensities are rescaled to the
/// image's own range, so normalized inputs render the same as raw ones.

pub fn view_classify<T: Real>(image: &Tensor<T>, probs: &Tensor<T>) -> Result<String> {
  let pixels = image.to_vec();
  let side = (pixels.len() as f64).sqrt() as usize;
  if side == 0 || side * side != pixels.len() {
    return Err(Error::shape(format!("Can't render {} values as a square image", pixels.len())))
  }
  let probs = probs.to_vec();
  if probs.is_empty() || probs.len() > side {
    return Err(Error::shape(format!("Can't render {} class probabilities", probs.len())))
  }

  let min = pixels.iter().copied().fold(T::infinity(), T::min);
  let max = pixels.iter().copied().fold(T::neg_infinity(), T::max);
  let range = if max > min { max - min } else { T::one() };
  let top = T::from(SHADES.len() - 1).unwrap();

  // Center the chart vertically next to the image
  let first_bar = (side - probs.len()) / 2;
  let mut out = String::new();
  for (row, chunk) in pixels.chunks(side).enumerate() {
    for &value in chunk {
      let level = ((value - min) / range * top).round().to_usize().unwrap_or(0);
      let shade = SHADES[level.min(SHADES.len() - 1)] as char;
      out.push(shade);
      out.push(shade);
    }
    if let Some(class) = row.checked_sub(first_bar).filter(|&class| class < probs.len() ) {
      let p = probs[class].to_f64().unwrap_or(0.0).clamp(0.0, 1.0);
      let filled = (p * BAR_WIDTH as f64).round() as usize;
      out += &format!("   {class} |{}{}| {p:.3}",
        "#".repeat(filled), " ".repeat(BAR_WIDTH - filled));
    }
    out.push('\n');
  }
  Ok(out)
}
