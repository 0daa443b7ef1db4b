//! In-place parameter initialization.
//!
//! All functions write through shared storage, so passing
//! `model.fc1.weight` or `model.parameter("fc1.weight")` re-initializes
//! the parameter inside the model.

use rand::Rng;
use tracing::debug;

use crate::{ ops::BaseOps, scalar::Real, Tensor };


pub fn constant_<T: Real>(tensor: &Tensor<T>, value: T) {
  debug!("Filling {} with {:?}", tensor.shape(), value);
  tensor.fill_(value);
}

pub fn zeros_<T: Real>(tensor: &Tensor<T>) {
  constant_(tensor, T::zero());
}

pub fn normal_<T: Real>(tensor: &Tensor<T>, mean: T, std: T, rng: &mut impl Rng) {
  debug!("Drawing {} from N({:?}, {:?}²)", tensor.shape(), mean, std);
  tensor.normal_(mean, std, rng);
}

pub fn uniform_<T: Real>(tensor: &Tensor<T>, low: T, high: T, rng: &mut impl Rng) {
  debug!("Drawing {} from U({:?}, {:?})", tensor.shape(), low, high);
  tensor.uniform_(low, high, rng);
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };
  use crate::nn::{ Module, Linear };

  #[test]
  fn reinitialize_layer() {
    let mut rng = StdRng::seed_from_u64(11);
    let fc1 = Linear::<f32>::with_rng(784, 128, &mut rng);
    zeros_(fc1.bias.as_ref().unwrap());
    normal_(&fc1.weight, 0.0, 0.01, &mut rng);

    let bias = fc1.parameter("bias").unwrap().summary();
    assert_eq!((bias.min, bias.max), (0.0, 0.0));
    let weight = fc1.parameter("weight").unwrap().summary();
    assert!((weight.std - 0.01).abs() < 0.001);
  }

  #[test]
  fn uniform_range() {
    let mut rng = StdRng::seed_from_u64(12);
    let t = Tensor::<f64>::zeros(&[1000]);
    uniform_(&t, 2.0, 3.0, &mut rng);
    let stats = t.summary();
    assert!(stats.min >= 2.0 && stats.max < 3.0);
  }

  #[test]
  fn constant() {
    let t = Tensor::<f64>::zeros(&[3]);
    constant_(&t, 0.5);
    assert_eq!(t, Tensor::vec(&[0.5, 0.5, 0.5]));
  }
}
