//! Digit images and the machinery to feed them to a network in batches.

use crate::Tensor;

mod mnist;
mod transform;
mod loader;

pub use mnist::{ Mnist, Split };
pub use transform::{ Transform, ToTensor, Normalize, Compose };
pub use loader::{ DataLoader, LoaderConfig, Batch, Batches };


/// A single grayscale image and its class.

#[derive(Debug, Clone)]
pub struct Sample {
  pub image: Tensor<u8>,
  pub label: u8,
}


/// Random access collection of labeled samples.

pub trait Dataset {
  fn len(&self) -> usize;

  /// Panics if `index` is out of range.
  fn get(&self, index: usize) -> Sample;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
