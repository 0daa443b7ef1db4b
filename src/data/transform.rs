use crate::{
  ops::BaseOps,
  error::{ Error, Result },
  Tensor,
};


/// Preprocessing step applied to every image before batching.
///
/// Images enter the pipeline as raw pixel intensities in `[0, 255]`,
/// shaped `[rows, cols]`.

pub trait Transform {
  fn apply(&self, image: &Tensor<f32>) -> Tensor<f32>;
}


/// Scales intensities to `[0, 1]` and adds a leading channel
/// dimension, giving `[1, rows, cols]`.

#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl Transform for ToTensor {
  fn apply(&self, image: &Tensor<f32>) -> Tensor<f32> {
    let scaled = image / 255.0;
    if scaled.rank() == 2 { scaled.unsqueeze(0) } else { scaled }
  }
}


/// Per-channel `(x - mean) / std` on `[channels, rows, cols]` images.

#[derive(Debug, Clone)]
pub struct Normalize {
  mean: Tensor<f32>,
  std: Tensor<f32>,
}

impl Normalize {
  pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
    if mean.len() != std.len() || mean.is_empty() {
      return Err(Error::config(format!(
        "Need one mean and std per channel, got {} and {}", mean.len(), std.len())))
    }
    if std.iter().any(|&s| s == 0.0 ) {
      return Err(Error::config("Standard deviation must not be zero"))
    }
    let channels = [mean.len(), 1, 1];
    Ok(Self {
      mean: Tensor::new(&channels, mean.to_vec()),
      std: Tensor::new(&channels, std.to_vec()),
    })
  }

  pub fn channels(&self) -> usize {
    self.mean.dim(0)
  }
}

impl Transform for Normalize {
  fn apply(&self, image: &Tensor<f32>) -> Tensor<f32> {
    assert!(image.rank() == 3 && image.dim(0) == self.channels(),
      "Normalize expects {} channel images, got {}", self.channels(), image.shape());
    &(image - &self.mean) / &self.std
  }
}


/// Transforms applied one after another.

#[derive(Default)]
pub struct Compose {
  transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn then(mut self, transform: impl Transform + 'static) -> Self {
    self.transforms.push(Box::new(transform));
    self
  }

  pub fn len(&self) -> usize {
    self.transforms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.transforms.is_empty()
  }
}

impl Transform for Compose {
  fn apply(&self, image: &Tensor<f32>) -> Tensor<f32> {
    self.transforms.iter()
      .fold(image.clone(), |x, transform| transform.apply(&x) )
  }
}
