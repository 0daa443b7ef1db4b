//! The digit classifiers, from raw weight matrices to declarative stacks.
//!
//! All architectures map flattened `[batch, 784]` images to `[batch, 10]`
//! outputs. Only [ManualNetwork] returns raw scores, the others end in a
//! softmax and return class probabilities.

use rand::Rng;
use serde::{ Serialize, Deserialize };
use tracing::debug;

use crate::{
  ops::*,
  scalar::Real,
  error::{ Error, Result },
  nn::{ functional as F, Module, Linear, Sigmoid, ReLU, Softmax, Sequential },
  Tensor,
};


/// Layer sizes of a fully connected network.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
  pub input_size: usize,
  pub hidden_sizes: Vec<usize>,
  pub output_size: usize,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      input_size: 784,
      hidden_sizes: vec![128, 64],
      output_size: 10,
    }
  }
}

impl NetworkConfig {
  /// Digit network with a single hidden layer.

  pub fn single(hidden_size: usize) -> Self {
    Self { hidden_sizes: vec![hidden_size], ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> {
    if self.input_size == 0 || self.output_size == 0 || self.hidden_sizes.contains(&0) {
      return Err(Error::config(format!("Layer sizes must be positive, got {self:?}")))
    }
    Ok(())
  }

  /// `(in, out)` of every weighted layer, input to output.

  pub fn layer_sizes(&self) -> Vec<(usize, usize)> {
    let mut sizes = vec![self.input_size];
    sizes.extend(&self.hidden_sizes);
    sizes.push(self.output_size);
    sizes.windows(2).map(|pair| (pair[0], pair[1]) ).collect()
  }

  fn hidden_layers(&self, expected: usize, network: &str) -> Result<()> {
    self.validate()?;
    if self.hidden_sizes.len() != expected {
      return Err(Error::config(format!(
        "{network} needs {expected} hidden layer(s), got {:?}", self.hidden_sizes)))
    }
    Ok(())
  }
}


/// Two-layer network computed with plain matrix products.
///
/// Weights are stored as `[in, out]` so the forward pass is
/// `sigmoid(x w1 + b1) w2 + b2`. No softmax is applied.

#[derive(Debug, Clone)]
pub struct ManualNetwork<T: Real> {
  pub w1: Tensor<T>,
  pub b1: Tensor<T>,
  pub w2: Tensor<T>,
  pub b2: Tensor<T>,
}

impl<T: Real> ManualNetwork<T> {
  pub fn new(config: &NetworkConfig) -> Result<Self> {
    Self::with_rng(config, &mut rand::thread_rng())
  }

  /// Draw all weights and biases from the standard normal distribution.

  pub fn with_rng(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Self> {
    config.hidden_layers(1, "ManualNetwork")?;
    let hidden = config.hidden_sizes[0];
    Ok(Self {
      w1: Tensor::randn_with(&[config.input_size, hidden], rng),
      b1: Tensor::randn_with(&[hidden], rng),
      w2: Tensor::randn_with(&[hidden, config.output_size], rng),
      b2: Tensor::randn_with(&[config.output_size], rng),
    })
  }
}

impl<T: Real> Module<T> for ManualNetwork<T> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    let h = (input.mm(&self.w1) + &self.b1).sigmoid();
    h.mm(&self.w2) + &self.b2
  }

  fn describe(&self) -> String {
    format!("ManualNetwork(w1={}, w2={})", self.w1.shape(), self.w2.shape())
  }

  fn own_parameters(&self) -> Vec<(String, Tensor<T>)> {
    vec![
      ("w1".to_string(), self.w1.clone()),
      ("b1".to_string(), self.b1.clone()),
      ("w2".to_string(), self.w2.clone()),
      ("b2".to_string(), self.b2.clone()),
    ]
  }
}


/// One hidden layer with sigmoid activation, softmax output.

#[derive(Debug, Clone)]
pub struct Network<T: Real> {
  pub hidden: Linear<T>,
  pub output: Linear<T>,
  pub sigmoid: Sigmoid,
  pub softmax: Softmax,
}

impl<T: Real> Network<T> {
  pub fn new(config: &NetworkConfig) -> Result<Self> {
    Self::with_rng(config, &mut rand::thread_rng())
  }

  pub fn with_rng(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Self> {
    config.hidden_layers(1, "Network")?;
    let hidden = config.hidden_sizes[0];
    Ok(Self {
      hidden: Linear::with_rng(config.input_size, hidden, rng),
      output: Linear::with_rng(hidden, config.output_size, rng),
      sigmoid: Sigmoid,
      softmax: Softmax::new(1),
    })
  }
}

impl<T: Real> Module<T> for Network<T> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    let x = self.hidden.forward(input);
    let x = self.sigmoid.forward(&x);
    let x = self.output.forward(&x);
    self.softmax.forward(&x)
  }

  fn describe(&self) -> String {
    "Network".to_string()
  }

  fn children(&self) -> Vec<(String, &dyn Module<T>)> {
    vec![
      ("hidden".to_string(), &self.hidden as &dyn Module<T>),
      ("output".to_string(), &self.output),
      ("sigmoid".to_string(), &self.sigmoid),
      ("softmax".to_string(), &self.softmax),
    ]
  }
}


/// Same architecture as [Network], with activations
/// taken from [functional](crate::nn::functional).

#[derive(Debug, Clone)]
pub struct FunctionalNetwork<T: Real> {
  pub hidden: Linear<T>,
  pub output: Linear<T>,
}

impl<T: Real> FunctionalNetwork<T> {
  pub fn new(config: &NetworkConfig) -> Result<Self> {
    Self::with_rng(config, &mut rand::thread_rng())
  }

  pub fn with_rng(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Self> {
    config.hidden_layers(1, "FunctionalNetwork")?;
    let hidden = config.hidden_sizes[0];
    Ok(Self {
      hidden: Linear::with_rng(config.input_size, hidden, rng),
      output: Linear::with_rng(hidden, config.output_size, rng),
    })
  }
}

impl<T: Real> Module<T> for FunctionalNetwork<T> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    let x = F::sigmoid(&self.hidden.forward(input));
    F::softmax(&self.output.forward(&x), 1)
  }

  fn describe(&self) -> String {
    "FunctionalNetwork".to_string()
  }

  fn children(&self) -> Vec<(String, &dyn Module<T>)> {
    vec![
      ("hidden".to_string(), &self.hidden as &dyn Module<T>),
      ("output".to_string(), &self.output),
    ]
  }
}


/// Deeper classifier with two ReLU hidden layers.

#[derive(Debug, Clone)]
pub struct DigitClassifier<T: Real> {
  pub fc1: Linear<T>,
  pub fc2: Linear<T>,
  pub fc3: Linear<T>,
}

impl<T: Real> DigitClassifier<T> {
  pub fn new(config: &NetworkConfig) -> Result<Self> {
    Self::with_rng(config, &mut rand::thread_rng())
  }

  pub fn with_rng(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Self> {
    config.hidden_layers(2, "DigitClassifier")?;
    let sizes = config.layer_sizes();
    Ok(Self {
      fc1: Linear::with_rng(sizes[0].0, sizes[0].1, rng),
      fc2: Linear::with_rng(sizes[1].0, sizes[1].1, rng),
      fc3: Linear::with_rng(sizes[2].0, sizes[2].1, rng),
    })
  }
}

impl<T: Real> Module<T> for DigitClassifier<T> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    let x = F::relu(&self.fc1.forward(input));
    let x = F::relu(&self.fc2.forward(&x));
    F::softmax(&self.fc3.forward(&x), 1)
  }

  fn describe(&self) -> String {
    "DigitClassifier".to_string()
  }

  fn children(&self) -> Vec<(String, &dyn Module<T>)> {
    vec![
      ("fc1".to_string(), &self.fc1 as &dyn Module<T>),
      ("fc2".to_string(), &self.fc2),
      ("fc3".to_string(), &self.fc3),
    ]
  }
}

display_module!(ManualNetwork, Network, FunctionalNetwork, DigitClassifier);


/// Stack of `Linear -> ReLU` pairs ending in `Linear -> Softmax`,
/// with children named by position.

pub fn sequential_classifier<T: Real>(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Sequential<T>> {
  config.validate()?;
  let sizes = config.layer_sizes();
  let last = sizes.len() - 1;
  let mut model = Sequential::new();
  for (i, &(n_in, n_out)) in sizes.iter().enumerate() {
    model = model.push(Linear::with_rng(n_in, n_out, rng));
    model = if i < last { model.push(ReLU) } else { model.push(Softmax::new(1)) };
  }
  debug!("Built sequential classifier with {} layers", model.len());
  Ok(model)
}

/// Same stack as [sequential_classifier], with children named
/// `fc1`, `relu1`, `fc2`, `relu2`, ..., `output` and `softmax`.

pub fn named_sequential_classifier<T: Real>(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Sequential<T>> {
  config.validate()?;
  let sizes = config.layer_sizes();
  let last = sizes.len() - 1;
  let mut model = Sequential::new();
  for (i, &(n_in, n_out)) in sizes.iter().enumerate() {
    let layer = Linear::with_rng(n_in, n_out, rng);
    model = if i < last {
      model
        .with(&format!("fc{}", i + 1), layer)?
        .with(&format!("relu{}", i + 1), ReLU)?
    } else {
      model
        .with("output", layer)?
        .with("softmax", Softmax::new(1))?
    };
  }
  debug!("Built named sequential classifier with {} layers", model.len());
  Ok(model)
}

/// Fraction of rows in `probs` whose most likely class matches `labels`.

pub fn accuracy<T: Real>(probs: &Tensor<T>, labels: &Tensor<u8>) -> f32 {
  assert_eq!(probs.dim(0), labels.size(),
    "{} rows of probabilities but {} labels", probs.dim(0), labels.size());
  let predicted = probs.argmax(-1).to_vec();
  let hits = predicted.iter()
    .zip(labels.to_vec())
    .filter(|&(&p, l)| p == l as usize )
    .count();
  hits as f32 / labels.size().max(1) as f32
}
