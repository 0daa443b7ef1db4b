use crate::{
  ops::*,
  scalar::Real,
  nn::Module,
  Tensor,
};


#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl<T: Real> Module<T> for Sigmoid {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    input.sigmoid()
  }

  fn describe(&self) -> String {
    "Sigmoid()".to_string()
  }
}


#[derive(Debug, Clone, Copy, Default)]
pub struct ReLU;

impl<T: Real> Module<T> for ReLU {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    input.relu()
  }

  fn describe(&self) -> String {
    "ReLU()".to_string()
  }
}


/// Normalizes scores along `dim` into probabilities.

#[derive(Debug, Clone, Copy)]
pub struct Softmax {
  pub dim: isize,
}

impl Softmax {
  pub fn new(dim: isize) -> Self {
    Self { dim }
  }
}

impl<T: Real> Module<T> for Softmax {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    input.softmax(self.dim)
  }

  fn describe(&self) -> String {
    format!("Softmax(dim={})", self.dim)
  }
}


/// Collapses every dimension from `start_dim` on, turning
/// `[64, 1, 28, 28]` images into `[64, 784]` rows.

#[derive(Debug, Clone, Copy)]
pub struct Flatten {
  pub start_dim: usize,
}

impl Default for Flatten {
  fn default() -> Self {
    Self { start_dim: 1 }
  }
}

impl<T: Real> Module<T> for Flatten {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    input.flatten_from(self.start_dim)
  }

  fn describe(&self) -> String {
    format!("Flatten(start_dim={})", self.start_dim)
  }
}

macro_rules! display_activation {
  ($($type:ident),+) => {
    $(
      impl std::fmt::Display for $type {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
          write!(f, "{}", Module::<f32>::describe(self))
        }
      }
    )+
  };
}

display_activation!(Sigmoid, ReLU, Softmax, Flatten);
