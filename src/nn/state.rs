use std::fs;
use std::path::Path;

use serde::{ Serialize, Deserialize, de::DeserializeOwned };
use tracing::debug;

use crate::{
  ops::BaseOps,
  scalar::Real,
  error::{ Error, Result },
  nn::Module,
  Tensor,
};


/// Ordered snapshot of a module's parameters, keyed by their dotted path.
///
/// Tensors are copied out of the module, so later changes to the
/// module don't affect the snapshot and vice versa.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDict<T: Real> {
  entries: Vec<(String, Tensor<T>)>,
}

impl<T: Real + Serialize + DeserializeOwned> StateDict<T> {
  pub fn from_module(module: &dyn Module<T>) -> Self {
    Self {
      entries: module.parameters().into_iter()
        .map(|(name, tensor)| (name, tensor.detach()) )
        .collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&Tensor<T>> {
    self.entries.iter()
      .find(|(key, _)| key == name )
      .map(|(_, tensor)| tensor )
  }

  pub fn keys(&self) -> impl Iterator<Item=&str> {
    self.entries.iter().map(|(key, _)| key.as_str() )
  }

  /// Copy every entry into the parameter of the same name.
  /// Fails without touching `module` if names or shapes disagree.

  pub fn load_into(&self, module: &dyn Module<T>) -> Result<()> {
    let params = module.parameters();
    if params.len() != self.entries.len() {
      return Err(Error::shape(format!(
        "Module has {} parameters, state holds {}", params.len(), self.entries.len())))
    }
    let mut pairs = Vec::with_capacity(params.len());
    for (name, param) in &params {
      let stored = self.get(name)
        .ok_or_else(|| Error::shape(format!("Missing parameter {name}")) )?;
      if stored.shape().dims != param.shape().dims {
        return Err(Error::shape(format!(
          "Parameter {name} is {} in module but {} in state", param.shape(), stored.shape())))
      }
      pairs.push((param, stored));
    }
    for (param, stored) in pairs {
      param.assign(stored)?;
    }
    Ok(())
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let bytes = postcard::to_allocvec(self)?;
    fs::write(&path, &bytes)?;
    debug!("Saved {} parameters ({} bytes) to {}", self.len(), bytes.len(), path.as_ref().display());
    Ok(())
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let bytes = fs::read(&path)?;
    let state: Self = postcard::from_bytes(&bytes)?;
    for (name, tensor) in &state.entries {
      let len = tensor.raw().len();
      if !tensor.shape().fits(len) {
        return Err(Error::format(format!("Parameter {name} {} does not fit {len} stored values", tensor.shape())))
      }
    }
    debug!("Loaded {} parameters from {}", state.len(), path.as_ref().display());
    Ok(state)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };
  use crate::nn::{ Linear, ReLU, Sequential };

  fn model(seed: u64) -> Sequential<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Sequential::new()
      .push(Linear::with_rng(8, 4, &mut rng))
      .push(ReLU)
      .push(Linear::with_rng(4, 2, &mut rng))
  }

  #[test]
  fn snapshot_is_detached() {
    let net = model(1);
    let state = StateDict::from_module(&net);
    assert_eq!(state.keys().collect::<Vec<_>>(), vec!["0.weight", "0.bias", "2.weight", "2.bias"]);
    net.parameter("0.bias").unwrap().fill_(7.0);
    assert!(state.get("0.bias").unwrap().param_iter().all(|b| b != 7.0 ));
  }

  #[test]
  fn save_and_load() {
    let path = std::env::temp_dir().join(format!("digitnet-state-{}.bin", std::process::id()));
    let source = model(2);
    StateDict::from_module(&source).save(&path).unwrap();

    let target = model(3);
    assert!(source.parameter("2.weight") != target.parameter("2.weight"));
    StateDict::<f32>::load(&path).unwrap().load_into(&target).unwrap();
    assert_eq!(source.parameter("2.weight"), target.parameter("2.weight"));
    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn rejects_mismatched_module() {
    let state = StateDict::from_module(&model(4));
    let mut rng = StdRng::seed_from_u64(5);
    let other = Sequential::new()
      .push(Linear::<f32>::with_rng(8, 5, &mut rng))
      .push(ReLU)
      .push(Linear::with_rng(5, 2, &mut rng));
    let before = other.parameter("0.weight").unwrap().detach();
    assert!(state.load_into(&other).is_err());
    assert_eq!(other.parameter("0.weight").unwrap(), before);
  }

  #[test]
  fn rejects_damaged_file() {
    // Same wire layout as a state dict, but with too few values for its shape
    #[derive(Serialize)]
    struct Layout { dims: Vec<usize>, strides: Vec<isize>, offset: usize }

    #[derive(Serialize)]
    struct Entry { shape: Layout, data: Vec<f32> }

    let entries = vec![
      ("weight".to_string(), Entry { shape: Layout { dims: vec![2, 3], strides: vec![3, 1], offset: 0 }, data: vec![1.0] }),
    ];
    let path = std::env::temp_dir().join(format!("digitnet-damaged-{}.bin", std::process::id()));
    std::fs::write(&path, postcard::to_allocvec(&(entries,)).unwrap()).unwrap();

    let err = StateDict::<f32>::load(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(err, Error::Format(_)));
  }

  #[test]
  fn missing_file() {
    let err = StateDict::<f32>::load("/nonexistent/digitnet/state.bin").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
  }
}
