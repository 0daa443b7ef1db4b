use crate::{
  scalar::Real,
  error::{ Error, Result },
  nn::Module,
  Tensor,
};


/// Chain of modules applied one after another.
///
/// Children are addressable by position (`model[0]`) and by name
/// ([get_named](Sequential::get_named)). Modules added with
/// [push](Sequential::push) are named after their position.

pub struct Sequential<T: Real> {
  layers: Vec<(String, Box<dyn Module<T>>)>,
}

impl<T: Real> Default for Sequential<T> {
  fn default() -> Self {
    Self { layers: vec![] }
  }
}

impl<T: Real> Sequential<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a module under an explicit name.

  pub fn with(mut self, name: &str, module: impl Module<T> + 'static) -> Result<Self> {
    self.insert(name, Box::new(module))?;
    Ok(self)
  }

  pub fn push(mut self, module: impl Module<T> + 'static) -> Self {
    let name = self.layers.len().to_string();
    if let Err(err) = self.insert(&name, Box::new(module)) {
      panic!("{err}");
    }
    self
  }

  pub fn insert(&mut self, name: &str, module: Box<dyn Module<T>>) -> Result<()> {
    if name.is_empty() || name.contains('.') {
      return Err(Error::config(format!("Invalid module name {name:?}")))
    }
    if self.layers.iter().any(|(existing, _)| existing == name ) {
      return Err(Error::config(format!("Duplicate module name {name:?}")))
    }
    self.layers.push((name.to_string(), module));
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.layers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&dyn Module<T>> {
    self.layers.get(index).map(|(_, module)| module.as_ref() )
  }

  pub fn get_named(&self, name: &str) -> Option<&dyn Module<T>> {
    self.layers.iter()
      .find(|(existing, _)| existing == name )
      .map(|(_, module)| module.as_ref() )
  }

  pub fn names(&self) -> impl Iterator<Item=&str> {
    self.layers.iter().map(|(name, _)| name.as_str() )
  }
}

impl<T: Real> Module<T> for Sequential<T> {
  fn forward(&self, input: &Tensor<T>) -> Tensor<T> {
    self.layers.iter()
      .fold(input.clone(), |x, (_, module)| module.forward(&x) )
  }

  fn describe(&self) -> String {
    "Sequential".to_string()
  }

  fn children(&self) -> Vec<(String, &dyn Module<T>)> {
    self.layers.iter()
      .map(|(name, module)| (name.clone(), module.as_ref()) )
      .collect()
  }
}

impl<T: Real> std::ops::Index<usize> for Sequential<T> {
  type Output = dyn Module<T>;

  fn index(&self, index: usize) -> &Self::Output {
    assert!(index < self.len(),
      "Index {index} out of range for Sequential of length {}", self.len());
    self.layers[index].1.as_ref()
  }
}

display_module!(Sequential);
