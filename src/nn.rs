//! Layer objects and containers for building feed-forward networks.
//!
//! Every building block implements [Module]. Containers expose their
//! children by name, which gives dotted parameter paths like `fc1.weight`
//! and a nested printout of the whole architecture.

use crate::{ Tensor, scalar::Real };


mod linear;
mod activation;
mod sequential;
mod state;

pub mod functional;
pub mod init;

pub use linear::Linear;
pub use activation::{ Sigmoid, ReLU, Softmax, Flatten };
pub use sequential::Sequential;
pub use state::StateDict;


/// A piece of a network that maps an input batch to an output batch.

pub trait Module<T: Real> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T>;

  /// One-line description, like `Linear(in_features=784, out_features=256, bias=True)`.
  fn describe(&self) -> String;

  /// Named sub-modules, in the order they get applied.
  fn children(&self) -> Vec<(String, &dyn Module<T>)> {
    vec![]
  }

  /// Tensors owned directly by this module, not by its children.
  fn own_parameters(&self) -> Vec<(String, Tensor<T>)> {
    vec![]
  }

  /// All parameters with dotted paths. The returned tensors share
  /// storage with the module, so in-place initializers affect it.
  fn parameters(&self) -> Vec<(String, Tensor<T>)> {
    let mut params = self.own_parameters();
    for (prefix, child) in self.children() {
      params.extend(child.parameters().into_iter()
        .map(|(name, tensor)| (format!("{prefix}.{name}"), tensor) ));
    }
    params
  }

  fn parameter(&self, path: &str) -> Option<Tensor<T>> {
    self.parameters().into_iter()
      .find(|(name, _)| name == path )
      .map(|(_, tensor)| tensor )
  }

  fn num_parameters(&self) -> usize {
    self.parameters().iter().map(|(_, tensor)| tensor.size() ).sum()
  }

  /// Multi-line printout of the module and all of its children.
  fn tree(&self) -> String {
    let children = self.children();
    if children.is_empty() { return self.describe() }
    let mut out = format!("{}(\n", self.describe());
    for (name, child) in children {
      let nested = child.tree().replace('\n', "\n  ");
      out += &format!("  ({name}): {nested}\n");
    }
    out + ")"
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };

  struct Pair<T: Real> {
    first: Linear<T>,
    act: ReLU,
    second: Linear<T>,
  }

  impl<T: Real> Module<T> for Pair<T> {
    fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
      self.second.forward(&self.act.forward(&self.first.forward(input)))
    }

    fn describe(&self) -> String {
      "Pair".to_string()
    }

    fn children(&self) -> Vec<(String, &dyn Module<T>)> {
      vec![
        ("first".to_string(), &self.first as &dyn Module<T>),
        ("act".to_string(), &self.act),
        ("second".to_string(), &self.second),
      ]
    }
  }

  fn pair() -> Pair<f32> {
    let mut rng = StdRng::seed_from_u64(0);
    Pair {
      first: Linear::with_rng(4, 3, &mut rng),
      act: ReLU,
      second: Linear::with_rng(3, 2, &mut rng),
    }
  }

  #[test]
  fn dotted_parameter_paths() {
    let names: Vec<_> = pair().parameters().into_iter().map(|(name, _)| name ).collect();
    assert_eq!(names, vec!["first.weight", "first.bias", "second.weight", "second.bias"]);
  }

  #[test]
  fn parameter_lookup_shares_storage() {
    let model = pair();
    let bias = model.parameter("first.bias").unwrap();
    bias.fill_(0.0);
    assert!(model.first.bias.as_ref().unwrap().param_iter().all(|b| b == 0.0 ));
    assert!(model.parameter("first.nope").is_none());
  }

  #[test]
  fn counts_parameters() {
    assert_eq!(pair().num_parameters(), 4 * 3 + 3 + 3 * 2 + 2);
  }

  #[test]
  fn tree() {
    let expected = "\
Pair(
  (first): Linear(in_features=4, out_features=3, bias=True)
  (act): ReLU()
  (second): Linear(in_features=3, out_features=2, bias=True)
)";
    assert_eq!(pair().tree(), expected);
  }
}
