use rand::{ SeedableRng, rngs::StdRng, seq::SliceRandom };
use serde::{ Serialize, Deserialize };
use tracing::debug;

use crate::{
  error::{ Error, Result },
  data::{ Dataset, Transform },
  Tensor,
};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
  pub batch_size: usize,
  pub shuffle: bool,
  pub drop_last: bool,
  /// Seed for the shuffling order. Drawn from the OS if absent.
  pub seed: Option<u64>,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self {
      batch_size: 64,
      shuffle: true,
      drop_last: false,
      seed: None,
    }
  }
}


/// Transformed images stacked to `[batch, channels, rows, cols]`
/// with one label each.

#[derive(Debug, Clone)]
pub struct Batch {
  pub images: Tensor<f32>,
  pub labels: Tensor<u8>,
}

impl Batch {
  pub fn len(&self) -> usize {
    self.labels.size()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}


/// Serves a data set in (optionally shuffled) batches.

pub struct DataLoader<D: Dataset> {
  dataset: D,
  transform: Box<dyn Transform>,
  config: LoaderConfig,
  rng: StdRng,
}

impl<D: Dataset> DataLoader<D> {
  pub fn new(dataset: D, transform: impl Transform + 'static, config: LoaderConfig) -> Result<Self> {
    if config.batch_size == 0 {
      return Err(Error::config("Batch size must be positive"))
    }
    let rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    debug!("Loader over {} samples: {:?}", dataset.len(), config);
    Ok(Self { dataset, transform: Box::new(transform), config, rng })
  }

  pub fn dataset(&self) -> &D {
    &self.dataset
  }

  pub fn config(&self) -> &LoaderConfig {
    &self.config
  }

  /// Number of batches per pass.

  pub fn len(&self) -> usize {
    let n = self.dataset.len();
    if self.config.drop_last {
      n / self.config.batch_size
    } else {
      n.div_ceil(self.config.batch_size)
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// One pass over the data set. Shuffled loaders draw a new order each time.

  pub fn iter(&mut self) -> Batches<'_, D> {
    let mut order: Vec<usize> = (0..self.dataset.len()).collect();
    if self.config.shuffle {
      order.shuffle(&mut self.rng);
    }
    if self.config.drop_last {
      order.truncate(self.len() * self.config.batch_size);
    }
    Batches { loader: self, order, cursor: 0 }
  }

  /// Transform a single sample the same way batches are.

  pub fn sample(&self, index: usize) -> (Tensor<f32>, u8) {
    let sample = self.dataset.get(index);
    (self.transform.apply(&sample.image.cast()), sample.label)
  }
}


pub struct Batches<'a, D: Dataset> {
  loader: &'a DataLoader<D>,
  order: Vec<usize>,
  cursor: usize,
}

impl<D: Dataset> Iterator for Batches<'_, D> {
  type Item = Result<Batch>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.order.len() { return None }
    let end = self.cursor.saturating_add(self.loader.config.batch_size).min(self.order.len());
    let (images, labels): (Vec<_>, Vec<_>) = self.order[self.cursor..end].iter()
      .map(|&i| self.loader.sample(i) )
      .unzip();
    self.cursor = end;
    Some(Tensor::rows(&images).map(|images| Batch { images, labels: Tensor::from_vec(labels) }))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.order.len() - self.cursor;
    let batches = left.div_ceil(self.loader.config.batch_size);
    (batches, Some(batches))
  }
}
