use rand::Rng;

use crate::{
  ops::*,
  scalar::Real,
  nn::Module,
  Tensor,
};


/// Fully connected layer computing `x Wᵀ + b`.
///
/// `weight` has shape `[out_features, in_features]` and `bias` shape
/// `[out_features]`. Both start out uniformly distributed in
/// `±1/√in_features`.

#[derive(Debug, Clone)]
pub struct Linear<T: Real> {
  pub weight: Tensor<T>,
  pub bias: Option<Tensor<T>>,
}

impl<T: Real> Linear<T> {
  pub fn new(in_features: usize, out_features: usize) -> Self {
    Self::with_rng(in_features, out_features, &mut rand::thread_rng())
  }

  pub fn with_rng(in_features: usize, out_features: usize, rng: &mut impl Rng) -> Self {
    let layer = Self::unbiased(in_features, out_features, rng);
    let bias = Tensor::zeros(&[out_features]);
    bias.uniform_(-layer.bound(), layer.bound(), rng);
    Self { bias: Some(bias), ..layer }
  }

  pub fn unbiased(in_features: usize, out_features: usize, rng: &mut impl Rng) -> Self {
    assert!(in_features > 0 && out_features > 0,
      "Linear layer needs positive sizes, got {in_features} -> {out_features}");
    let weight = Tensor::zeros(&[out_features, in_features]);
    let layer = Self { weight, bias: None };
    layer.weight.uniform_(-layer.bound(), layer.bound(), rng);
    layer
  }

  fn bound(&self) -> T {
    T::one() / T::from(self.in_features()).unwrap().sqrt()
  }

  pub fn in_features(&self) -> usize {
    self.weight.dim(1)
  }

  pub fn out_features(&self) -> usize {
    self.weight.dim(0)
  }
}

impl<T: Real> Module<T> for Linear<T> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    let out = input.mm(&self.weight.transpose(0, 1));
    match &self.bias {
      Some(bias) => out + bias,
      None => out,
    }
  }

  fn describe(&self) -> String {
    format!("Linear(in_features={}, out_features={}, bias={})",
      self.in_features(), self.out_features(),
      if self.bias.is_some() { "True" } else { "False" })
  }

  fn own_parameters(&self) -> Vec<(String, Tensor<T>)> {
    let mut params = vec![("weight".to_string(), self.weight.clone())];
    if let Some(bias) = &self.bias {
      params.push(("bias".to_string(), bias.clone()));
    }
    params
  }
}

display_module!(Linear);


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };

  #[test]
  fn shapes() {
    let mut rng = StdRng::seed_from_u64(1);
    let fc = Linear::<f32>::with_rng(784, 128, &mut rng);
    assert_eq!(fc.weight.shape().dims, vec![128, 784]);
    assert_eq!(fc.bias.as_ref().unwrap().shape().dims, vec![128]);
    let out = fc.forward(&Tensor::zeros(&[64, 784]));
    assert_eq!(out.shape().dims, vec![64, 128]);
  }

  #[test]
  fn batched_rows() {
    // One image resized to [1, 784] or a batch resized to [64, 1, 784]
    let mut rng = StdRng::seed_from_u64(2);
    let fc = Linear::<f32>::with_rng(784, 10, &mut rng);
    assert_eq!(fc.forward(&Tensor::ones(&[64, 1, 784])).shape().dims, vec![64, 1, 10]);
    assert_eq!(fc.forward(&Tensor::ones(&[784])).shape().dims, vec![10]);
  }

  #[test]
  fn computes_affine_map() {
    let fc = Linear {
      weight: Tensor::new(&[2, 3], vec![1., 0., 2., 0., 1., -1.]),
      bias: Some(Tensor::vec(&[0.5, -0.5])),
    };
    let x = Tensor::new(&[1, 3], vec![1., 2., 3.]);
    assert_eq!(fc.forward(&x), Tensor::new(&[1, 2], vec![7.5, -1.5]));
  }

  #[test]
  fn default_init_bounds() {
    let mut rng = StdRng::seed_from_u64(3);
    let fc = Linear::<f64>::with_rng(100, 50, &mut rng);
    let stats = fc.weight.summary();
    assert!(stats.min >= -0.1 && stats.max < 0.1);
    assert!(stats.max - stats.min > 0.15);
  }

  #[test]
  fn describe() {
    let mut rng = StdRng::seed_from_u64(4);
    let fc = Linear::<f32>::unbiased(64, 10, &mut rng);
    assert_eq!(fc.to_string(), "Linear(in_features=64, out_features=10, bias=False)");
    assert_eq!(fc.parameters().len(), 1);
  }
}
