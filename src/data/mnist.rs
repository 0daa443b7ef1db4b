use std::fs;
use std::path::{ Path, PathBuf };

use rand::{ Rng, SeedableRng, rngs::StdRng };
use tracing::debug;

use crate::{
  ops::BaseOps,
  error::{ Error, Result },
  data::{ Dataset, Sample },
  Tensor,
};


const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;
const SIDE: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
  Train,
  Test,
}

impl Split {
  fn prefix(self) -> &'static str {
    match self {
      Self::Train => "train",
      Self::Test => "t10k",
    }
  }
}


/// Handwritten digits in IDX format.
///
/// Images are kept as one `[n, rows, cols]` byte tensor, samples
/// are views into it.

#[derive(Debug, Clone)]
pub struct Mnist {
  images: Tensor<u8>,
  labels: Vec<u8>,
}

impl Mnist {
  pub fn from_bytes(images: &[u8], labels: &[u8]) -> Result<Self> {
    let images = parse_images(images)?;
    let labels = parse_labels(labels)?;
    if images.dim(0) != labels.len() {
      return Err(Error::format(format!("{} images but {} labels", images.dim(0), labels.len())))
    }
    Ok(Self { images, labels })
  }

  pub fn from_files(images: impl AsRef<Path>, labels: impl AsRef<Path>) -> Result<Self> {
    let dataset = Self::from_bytes(&fs::read(&images)?, &fs::read(&labels)?)?;
    debug!("Loaded {} digits from {}", dataset.len(), images.as_ref().display());
    Ok(dataset)
  }

  /// Load a split from a directory holding the standard file names,
  /// like `train-images-idx3-ubyte` or `train-images.idx3-ubyte`.

  pub fn from_dir(dir: impl AsRef<Path>, split: Split) -> Result<Self> {
    let dir = dir.as_ref();
    let images = locate(dir, split, "images", "idx3-ubyte")?;
    let labels = locate(dir, split, "labels", "idx1-ubyte")?;
    Self::from_files(images, labels)
  }

  /// Deterministic stand-in for the real data set: seven-segment digits,
  /// randomly shifted and shaded.

  pub fn synthetic(n: usize, seed: u64) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pixels = Vec::with_capacity(n * SIDE * SIDE);
    let labels: Vec<u8> = (0..n).map(|_| {
      let label = rng.gen_range(0u8, 10);
      pixels.extend(draw_digit(label, &mut rng));
      label
    }).collect();
    debug!("Generated {} synthetic digits", n);
    Self { images: Tensor::new(&[n, SIDE, SIDE], pixels), labels }
  }

  pub fn labels(&self) -> &[u8] {
    &self.labels
  }

  pub fn image_dims(&self) -> (usize, usize) {
    (self.images.dim(1), self.images.dim(2))
  }
}

impl Dataset for Mnist {
  fn len(&self) -> usize {
    self.labels.len()
  }

  fn get(&self, index: usize) -> Sample {
    assert!(index < self.len(),
      "Sample {index} out of range for data set of size {}", self.len());
    Sample { image: self.images.at(&[index]), label: self.labels[index] }
  }
}


fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32> {
  bytes.get(offset..offset + 4)
    .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) )
    .ok_or_else(|| Error::format("Truncated IDX header") )
}

fn check_magic(bytes: &[u8], expected: u32) -> Result<()> {
  let magic = read_u32_be(bytes, 0)?;
  if magic != expected {
    return Err(Error::format(format!("Invalid magic number {magic}, expected {expected}")))
  }
  Ok(())
}

fn parse_images(bytes: &[u8]) -> Result<Tensor<u8>> {
  check_magic(bytes, IMAGE_MAGIC)?;
  let n = read_u32_be(bytes, 4)? as usize;
  let rows = read_u32_be(bytes, 8)? as usize;
  let cols = read_u32_be(bytes, 12)? as usize;
  let body = &bytes[16..];
  let len = n.checked_mul(rows)
    .and_then(|len| len.checked_mul(cols) )
    .ok_or_else(|| Error::format(format!("Image header {n}x{rows}x{cols} is too large")) )?;
  if body.len() < len {
    return Err(Error::format(format!("Expected {len} pixels, found {}", body.len())))
  }
  Ok(Tensor::new(&[n, rows, cols], body[..len].to_vec()))
}

fn parse_labels(bytes: &[u8]) -> Result<Vec<u8>> {
  check_magic(bytes, LABEL_MAGIC)?;
  let n = read_u32_be(bytes, 4)? as usize;
  let body = &bytes[8..];
  if body.len() < n {
    return Err(Error::format(format!("Expected {n} labels, found {}", body.len())))
  }
  if let Some(label) = body[..n].iter().find(|&&label| label > 9 ) {
    return Err(Error::format(format!("Label {label} is not a digit")))
  }
  Ok(body[..n].to_vec())
}

fn locate(dir: &Path, split: Split, kind: &str, suffix: &str) -> Result<PathBuf> {
  let candidates = [
    format!("{}-{kind}-{suffix}", split.prefix()),
    format!("{}-{kind}.{suffix}", split.prefix()),
  ];
  candidates.iter()
    .map(|name| dir.join(name) )
    .find(|path| path.is_file() )
    .ok_or_else(|| Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound,
      format!("No {} found in {}", candidates[0], dir.display()))) )
}

// Segments a to g: top, upper right, lower right, bottom, lower left, upper left, middle
const SEGMENTS: [[bool; 7]; 10] = [
  [true, true, true, true, true, true, false],
  [false, true, true, false, false, false, false],
  [true, true, false, true, true, false, true],
  [true, true, true, true, false, false, true],
  [false, true, true, false, false, true, true],
  [true, false, true, true, false, true, true],
  [true, false, true, true, true, true, true],
  [true, true, true, false, false, false, false],
  [true, true, true, true, true, true, true],
  [true, true, true, true, false, true, true],
];

fn draw_digit(label: u8, rng: &mut impl Rng) -> Vec<u8> {
  let mut image = vec![0u8; SIDE * SIDE];
  let dx: isize = rng.gen_range(-3, 4);
  let dy: isize = rng.gen_range(-3, 4);
  let shade = rng.gen_range(180u16, 256) as u8;
  let left = (8 + dx) as usize;
  let right = (18 + dx) as usize;
  let top = (4 + dy) as usize;
  let middle = (13 + dy) as usize;
  let bottom = (22 + dy) as usize;

  let mut horizontal = |y: usize| {
    for x in left..=right + 1 {
      image[y * SIDE + x] = shade;
      image[(y + 1) * SIDE + x] = shade;
    }
  };
  let on = SEGMENTS[label as usize];
  if on[0] { horizontal(top) }
  if on[3] { horizontal(bottom) }
  if on[6] { horizontal(middle) }

  let mut vertical = |x: usize, from: usize, to: usize| {
    for y in from..=to + 1 {
      image[y * SIDE + x] = shade;
      image[y * SIDE + x + 1] = shade;
    }
  };
  if on[1] { vertical(right, top, middle) }
  if on[2] { vertical(right, middle, bottom) }
  if on[4] { vertical(left, middle, bottom) }
  if on[5] { vertical(left, top, middle) }
  image
}


#[cfg(test)]
mod tests {
  use super::*;

  fn idx_images(n: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
    let mut bytes = vec![];
    for word in [IMAGE_MAGIC, n, rows, cols] {
      bytes.extend(word.to_be_bytes());
    }
    bytes.extend(pixels);
    bytes
  }

  fn idx_labels(labels: &[u8]) -> Vec<u8> {
    let mut bytes = vec![];
    for word in [LABEL_MAGIC, labels.len() as u32] {
      bytes.extend(word.to_be_bytes());
    }
    bytes.extend(labels);
    bytes
  }

  #[test]
  fn parse() {
    let pixels: Vec<u8> = (0..8).collect();
    let mnist = Mnist::from_bytes(&idx_images(2, 2, 2, &pixels), &idx_labels(&[3, 7])).unwrap();
    assert_eq!(mnist.len(), 2);
    assert_eq!(mnist.image_dims(), (2, 2));
    let sample = mnist.get(1);
    assert_eq!(sample.label, 7);
    assert_eq!(sample.image, Tensor::new(&[2, 2], vec![4, 5, 6, 7]));
  }

  #[test]
  fn bad_magic() {
    let mut images = idx_images(1, 1, 1, &[0]);
    images[3] = 0;
    let err = Mnist::from_bytes(&images, &idx_labels(&[0])).unwrap_err();
    assert!(matches!(err, Error::Format(_)));
    assert!(Mnist::from_bytes(&idx_images(1, 1, 1, &[0]), &idx_images(1, 1, 1, &[0])).is_err());
  }

  #[test]
  fn truncated() {
    assert!(Mnist::from_bytes(&idx_images(2, 2, 2, &[0; 7]), &idx_labels(&[1, 2])).is_err());
    assert!(Mnist::from_bytes(&[0, 0, 8], &idx_labels(&[1])).is_err());
  }

  #[test]
  fn oversized_header() {
    let images = idx_images(u32::MAX, u32::MAX, u32::MAX, &[0; 4]);
    let err = Mnist::from_bytes(&images, &idx_labels(&[1])).unwrap_err();
    assert!(matches!(err, Error::Format(_)));
  }

  #[test]
  fn count_mismatch() {
    let err = Mnist::from_bytes(&idx_images(2, 1, 1, &[0, 0]), &idx_labels(&[1])).unwrap_err();
    assert_eq!(err.to_string(), "Malformed data: 2 images but 1 labels");
  }

  #[test]
  fn from_dir() {
    let dir = std::env::temp_dir().join(format!("digitnet-mnist-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("t10k-images.idx3-ubyte"), idx_images(1, 2, 2, &[9, 9, 9, 9])).unwrap();
    fs::write(dir.join("t10k-labels-idx1-ubyte"), idx_labels(&[5])).unwrap();
    let mnist = Mnist::from_dir(&dir, Split::Test).unwrap();
    assert_eq!(mnist.labels(), &[5]);
    assert!(matches!(Mnist::from_dir(&dir, Split::Train).unwrap_err(), Error::Io(_)));
    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn synthetic_is_deterministic() {
    let a = Mnist::synthetic(20, 3);
    let b = Mnist::synthetic(20, 3);
    assert_eq!(a.labels(), b.labels());
    assert_eq!(a.get(7).image, b.get(7).image);
    assert_eq!(a.image_dims(), (28, 28));
    assert!(a.labels().iter().all(|&l| l < 10 ));
  }

  #[test]
  fn synthetic_one_is_thin() {
    let lit = |label| draw_digit(label, &mut StdRng::seed_from_u64(0)).iter().filter(|&&p| p > 0 ).count();
    assert!(lit(1) < lit(8));
    assert!(lit(1) > 0);
  }
}
