use std::rc::Rc;
use std::cell::{ Ref, RefMut, RefCell };
use std::ops::Range;

use rand::Rng;
use itertools::Itertools;
use serde::{ Serialize, Deserialize };

mod cops;
mod lops;

use crate::{
  internal::*,
  shape::Shape,
  error::{ Error, Result },
  scalar::{ Inner, Numeric, Real },
  ops::{ BaseOps, Hops },
};


/// Multidimensional array.
///
/// Clones and views ([at](Tensor::at), [view](Tensor::view),
/// [transpose](BaseOps::transpose), ...) share their storage, so
/// in-place initializers like [normal_](Tensor::normal_) called
/// on a view write through to the tensor it was taken from.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor<T: Inner> {
  shape: Shape,
  data: Rc<RefCell<Vec<T>>>,
}

impl<T: Real> Hops<T> for Tensor<T> {}

impl<T: Inner> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    if self.shape.squeeze().dims != rhs.shape.squeeze().dims { return false }
    let data_l = self.data.borrow();
    let data_r = rhs.data.borrow();
    self.shape.iter()
      .zip(rhs.shape.iter())
      .all(|(i, j)| data_l[i] == data_r[j] )
  }
}

impl<T: Inner> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data: Rc::new(RefCell::new(data)) }
  }

  pub fn new(dims: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(dims), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn from_vec(vec: Vec<T>) -> Self {
    Self::new(&[vec.len()], vec)
  }

  /// Stack equally shaped tensors along a new leading dimension.

  pub fn rows(rows: &[Self]) -> Result<Self> {
    let first = rows.first()
      .ok_or_else(|| Error::shape("Cannot stack zero tensors") )?;
    let mut data = Vec::with_capacity(first.size() * rows.len());
    for row in rows {
      if row.shape.dims != first.shape.dims {
        return Err(Error::shape(format!("Cannot stack {} with {}", row.shape, first.shape)))
      }
      data.extend(row.param_iter());
    }
    let dims = [&[rows.len()], &first.shape.dims[..]].concat();
    Ok(Self::new(&dims, data))
  }

  pub fn raw(&self) -> Ref<'_, Vec<T>> {
    self.data.borrow()
  }

  pub(crate) fn raw_mut(&self) -> RefMut<'_, Vec<T>> {
    self.data.borrow_mut()
  }

  /// Values in logical order.

  pub fn to_vec(&self) -> Vec<T> {
    self.param_iter().collect()
  }

  pub fn into_raw(self) -> Vec<T> {
    if self.shape.contiguous() && self.shape.offset == 0 && self.size() == self.raw().len() {
      Rc::unwrap_or_clone(self.data).into_inner()
    } else {
      self.to_vec()
    }
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn shares_storage(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }

  /// Overwrite our elements with those of `other`.

  pub fn assign(&self, other: &Self) -> Result<()> {
    if self.shape.squeeze().dims != other.shape.squeeze().dims {
      return Err(Error::shape(format!("Could not assign {} tensor to {} tensor", other.shape, self.shape)))
    }
    // Borrowing the same cell twice would panic
    let values = other.to_vec();
    let mut data = self.raw_mut();
    for (i, value) in self.shape.iter().zip(values) {
      data[i] = value;
    }
    Ok(())
  }

  pub fn contiguous(&self) -> Self {
    if self.shape.contiguous() {
      self.clone()
    } else {
      self.detach()
    }
  }

  /// Copy into fresh storage.

  pub fn detach(&self) -> Self {
    Self::new(&self.shape.dims, self.to_vec())
  }

  /// Combine with `rhs` elementwise, broadcasting both sides as needed.

  pub fn try_zip<O, F>(&self, rhs: &Self, cb: F) -> Result<Tensor<O>>
  where
    O: Inner,
    F: Fn((T, T)) -> O,
  {
    let lhs_shape = self.shape.broadcast(&rhs.shape)?;
    let rhs_shape = rhs.shape.broadcast(&lhs_shape)?;
    let data_l = self.raw();
    let data_r = rhs.raw();
    let data = lhs_shape.iter()
      .zip(rhs_shape.iter())
      .map(|(i, j)| cb((data_l[i], data_r[j])) )
      .collect();
    Ok(Tensor::new(&lhs_shape.dims, data))
  }

  pub fn zip<O, F>(&self, rhs: &Self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: Fn((T, T)) -> O,
  {
    self.try_zip(rhs, cb).unwrap_or_else(|err| panic!("{err}") )
  }

  pub fn vectorize<O, F>(&self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut(T) -> O,
  {
    let data = self.param_iter().map(cb).collect();
    Tensor::new(&self.shape.dims, data)
  }

  /// Reduce `dim` and all dimensions behind it, handing
  /// each group of values to `cb` in logical order.

  pub fn collapse<O, F>(&self, dim: isize, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: Fn(&[T]) -> O,
  {
    let dim = negative_index(dim, self.rank(), false);
    let this = self.contiguous();
    let group: usize = this.shape.dims[dim..].iter().product();
    let data = this.raw();
    let start = this.shape.offset;
    let data = if group == 0 {
      vec![cb(&[]); this.shape.dims[..dim].iter().product()]
    } else {
      data[start..start + this.size()]
        .chunks(group)
        .map(cb)
        .collect()
    };
    Tensor::new(&this.shape.dims[..dim], data)
  }

  /// Slices along `dim`, i.e. all sub-tensors with the leading `dim + 1` indices fixed.

  pub fn iter(&self, dim: isize) -> TensorSliceIterator<T> {
    TensorSliceIterator::new(self, dim)
  }

  pub fn param_iter(&self) -> TensorIterator<'_, T> {
    TensorIterator::new(self)
  }

  pub fn at(&self, indices: &[usize]) -> Self {
    Self { shape: self.shape.take(indices), data: self.data.clone() }
  }

  pub fn range(&self, ranges: &[Range<isize>]) -> Self {
    Self { shape: self.shape.range(ranges), data: self.data.clone() }
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1,
      "Can't extract item from non-scalar {}", self.shape);
    self.raw()[self.shape.offset]
  }

  pub fn try_view(&self, dims: &[usize]) -> Result<Self> {
    Ok(Self { shape: self.shape.view(dims)?, data: self.data.clone() })
  }

  /// Reinterpret without copying. Use `0` for a single inferred dimension.

  pub fn view(&self, dims: &[usize]) -> Self {
    self.try_view(dims).unwrap_or_else(|err| panic!("{err}") )
  }

  /// Collapse all dimensions from `dim` on into one, copying only if needed.

  pub fn flatten_from(&self, dim: usize) -> Self {
    let mut dims = self.shape.dims[..dim].to_vec();
    dims.push(self.shape.dims[dim..].iter().product());
    self.reshape(&dims)
  }

  pub fn squeeze(&self) -> Self {
    Self { shape: self.shape.squeeze(), data: self.data.clone() }
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn arrange(shape: &[usize], start: T, step: T) -> Self {
    Self::new(shape, (0..shape.iter().product())
      .map(|i| T::from(i).unwrap() * step + start )
      .collect())
  }

  pub fn add(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a + b )
  }

  pub fn sub(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a - b )
  }

  pub fn mul(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a * b )
  }

  pub fn div(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a / b )
  }

  pub fn rem(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a % b )
  }

  /// Collapse dimension using index of its greatest value

  pub fn argmax(&self, dim: isize) -> Tensor<usize> {
    self.collapse(dim, |values| {
      let mut best = 0;
      for (i, &value) in values.iter().enumerate() {
        if value > values[best] { best = i }
      }
      best
    })
  }

  pub fn cast<I: Numeric>(&self) -> Tensor<I> {
    self.vectorize(|a| I::from(a).unwrap() )
  }

  /// Overwrite every element with `value`.

  pub fn fill_(&self, value: T) {
    let mut data = self.raw_mut();
    for i in self.shape.iter() {
      data[i] = value;
    }
  }
}

impl<T: Real> Tensor<T> {
  pub fn rand(shape: &[usize]) -> Self {
    Self::rand_with(shape, &mut rand::thread_rng())
  }

  pub fn rand_with(shape: &[usize], rng: &mut impl Rng) -> Self {
    let data = (0..shape.iter().product())
      .map(|_| rng.gen_range(T::zero(), T::one()) )
      .collect();
    Self::new(shape, data)
  }

  /// Samples from the standard normal distribution.

  pub fn randn(shape: &[usize]) -> Self {
    Self::randn_with(shape, &mut rand::thread_rng())
  }

  pub fn randn_with(shape: &[usize], rng: &mut impl Rng) -> Self {
    let len: usize = shape.iter().product();
    let mut data = Vec::with_capacity(len + 1);
    while data.len() < len {
      let (a, b) = randn(rng);
      data.push(a);
      data.push(b);
    }
    data.truncate(len);
    Self::new(shape, data)
  }

  /// Redraw every element from `N(mean, std²)`.

  pub fn normal_(&self, mean: T, std: T, rng: &mut impl Rng) {
    let fresh = Self::randn_with(&self.shape.dims, rng);
    let mut data = self.raw_mut();
    for (i, z) in self.shape.iter().zip(fresh.param_iter()) {
      data[i] = mean + z * std;
    }
  }

  /// Redraw every element uniformly from `[low, high)`.

  pub fn uniform_(&self, low: T, high: T, rng: &mut impl Rng) {
    let mut data = self.raw_mut();
    for i in self.shape.iter() {
      data[i] = rng.gen_range(low, high);
    }
  }

  /// Descriptive statistics over all elements.

  pub fn summary(&self) -> Summary<T> {
    let values = self.to_vec();
    let n = T::from(values.len().max(1)).unwrap();
    let mean = values.iter().fold(T::zero(), |acc, &a| acc + a ) / n;
    let var = values.iter().fold(T::zero(), |acc, &a| acc + (a - mean) * (a - mean) ) / n;
    Summary {
      dims: self.shape.dims.clone(),
      min: values.iter().copied().fold(T::infinity(), T::min),
      max: values.iter().copied().fold(T::neg_infinity(), T::max),
      mean,
      std: var.sqrt(),
    }
  }
}


/// Shape and value statistics of a tensor, as printed when inspecting parameters.

#[derive(Debug, Clone, PartialEq)]
pub struct Summary<T> {
  pub dims: Vec<usize>,
  pub min: T,
  pub max: T,
  pub mean: T,
  pub std: T,
}

impl<T: Real> std::fmt::Display for Summary<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "{:?} min={:.4?} max={:.4?} mean={:.4?} std={:.4?}",
      self.dims, self.min, self.max, self.mean, self.std)
  }
}


// Rows and columns shown at each end of a long dimension
const EDGE_ITEMS: usize = 3;

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(self, 0, f)?;
    writeln!(f)
  }
}

fn print_chunks<T: Inner>(tensor: &Tensor<T>, depth: usize, f: &mut std::fmt::Formatter) -> std::fmt::Result {
  if tensor.rank() == 0 {
    return write!(f, "{:.4?}", tensor.item())
  }
  let n = tensor.shape[0];
  let shown: Vec<Option<usize>> = if n > 2 * EDGE_ITEMS {
    (0..EDGE_ITEMS).map(Some)
      .chain(std::iter::once(None))
      .chain((n - EDGE_ITEMS..n).map(Some))
      .collect()
  } else {
    (0..n).map(Some).collect()
  };
  if tensor.rank() == 1 {
    let items = shown.iter().map(|i| match i {
      Some(i) => format!("{:.4?}", tensor.at(&[*i]).item()),
      None => "...".to_string(),
    }).join(", ");
    return write!(f, "[{items}]")
  }
  let indent = "  ".repeat(depth + 1);
  writeln!(f, "[")?;
  for i in shown {
    write!(f, "{indent}")?;
    match i {
      Some(i) => print_chunks(&tensor.at(&[i]), depth + 1, f)?,
      None => write!(f, "...")?,
    }
    writeln!(f, ",")?;
  }
  write!(f, "{}]", "  ".repeat(depth))
}


pub struct TensorSliceIterator<T: Inner> {
  tensor: Tensor<T>,
  lead: Vec<usize>,
  index: usize,
  count: usize,
}

impl<T: Inner> TensorSliceIterator<T> {
  fn new(tensor: &Tensor<T>, dim: isize) -> Self {
    let dim = negative_index(dim, tensor.rank(), false);
    let lead = tensor.shape.dims[..=dim].to_vec();
    Self {
      tensor: tensor.clone(),
      count: lead.iter().product(),
      lead,
      index: 0,
    }
  }
}

impl<T: Inner> Iterator for TensorSliceIterator<T> {
  type Item = Tensor<T>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.index == self.count { return None }
    // Decompose the running index into one index per leading dimension
    let mut rest = self.index;
    let mut indices = vec![0; self.lead.len()];
    for d in (0..self.lead.len()).rev() {
      indices[d] = rest % self.lead[d];
      rest /= self.lead[d];
    }
    self.index += 1;
    Some(self.tensor.at(&indices))
  }
}


pub struct TensorIterator<'a, T: Inner> {
  data: Ref<'a, Vec<T>>,
  shape_iter: Box<dyn Iterator<Item=usize> + 'a>,
}

impl<'a, T: Inner> TensorIterator<'a, T> {
  fn new(tensor: &'a Tensor<T>) -> Self {
    Self {
      data: tensor.data.borrow(),
      shape_iter: tensor.shape.iter(),
    }
  }
}

impl<T: Inner> Iterator for TensorIterator<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<Self::Item> {
    self.shape_iter.next().map(|i| self.data[i] )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };
  use crate::ops::*;

  #[test]
  fn index() {
    let x = Tensor::new(&[2,2,2], vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(x.at(&[0,0]), Tensor::vec(&[1, 2]));
    assert_eq!(x.at(&[1,1]), Tensor::vec(&[7, 8]));
    assert_eq!(x.at(&[0]), Tensor::new(&[2,2], vec![1, 2, 3, 4]));
    assert_eq!(x.at(&[1,0,1]).item(), 6);
  }

  #[test]
  fn range() {
    let x = Tensor::vec(&[3, 5, 6]);
    assert_eq!(x.range(&[1..-1]), Tensor::vec(&[5, 6]));
  }

  #[test]
  fn broadcast_bias() {
    let x = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]);
    let b = Tensor::vec(&[10, 20, 30]);
    assert_eq!(x.add(&b), Tensor::new(&[2,3], vec![11, 22, 33, 14, 25, 36]));
    let col = Tensor::new(&[2,1], vec![1, 2]);
    assert_eq!(x.mul(&col), Tensor::new(&[2,3], vec![1, 2, 3, 8, 10, 12]));
  }

  #[test]
  fn broadcast_mismatch() {
    let x = Tensor::<f32>::zeros(&[2,3]);
    assert!(x.try_zip(&Tensor::zeros(&[4]), |(a, b)| a + b ).is_err());
  }

  #[test]
  fn views_share_storage() {
    let x = Tensor::<f32>::zeros(&[4,3]);
    let row = x.at(&[2]);
    row.fill_(1.0);
    assert_eq!(x.sum(0).item(), 3.0);
    assert!(row.shares_storage(&x));
  }

  #[test]
  fn flatten() {
    let images = Tensor::<f32>::zeros(&[64,1,28,28]);
    assert_eq!(images.flatten_from(1).shape().dims, vec![64, 784]);
    assert_eq!(images.view(&[64, 0]).shape().dims, vec![64, 784]);
    assert!(images.flatten_from(1).shares_storage(&images));
  }

  #[test]
  fn rows() {
    let a = Tensor::vec(&[1, 2]);
    let b = Tensor::vec(&[3, 4]);
    assert_eq!(Tensor::rows(&[a.clone(), b]).unwrap(), Tensor::new(&[2,2], vec![1, 2, 3, 4]));
    assert!(Tensor::rows(&[a, Tensor::vec(&[1])]).is_err());
    assert!(Tensor::<i32>::rows(&[]).is_err());
  }

  #[test]
  fn assign_checks_shape() {
    let x = Tensor::<f32>::zeros(&[2,2]);
    assert!(x.assign(&Tensor::ones(&[3])).is_err());
    x.assign(&Tensor::ones(&[2,2])).unwrap();
    assert_eq!(x, Tensor::ones(&[2,2]));
    // Assigning from an overlapping view must not panic
    x.assign(&x.transpose(0, 1)).unwrap();
  }

  #[test]
  fn argmax() {
    let x = Tensor::new(&[2,3], vec![-3.0, -1.0, -2.0, 0.5, 0.1, 0.9]);
    assert_eq!(x.argmax(-1), Tensor::vec(&[1usize, 2]));
  }

  #[test]
  fn slices() {
    let x = Tensor::arrange(&[2,3], 0, 1);
    let rows: Vec<_> = x.iter(0).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], Tensor::vec(&[3, 4, 5]));
    assert_eq!(x.iter(1).count(), 6);
  }

  #[test]
  fn normal_init() {
    let mut rng = StdRng::seed_from_u64(3);
    let w = Tensor::<f64>::zeros(&[100, 100]);
    w.normal_(0.0, 0.01, &mut rng);
    let stats = w.summary();
    assert!(stats.mean.abs() < 0.001);
    assert!((stats.std - 0.01).abs() < 0.001);
  }

  #[test]
  fn uniform_init() {
    let mut rng = StdRng::seed_from_u64(5);
    let w = Tensor::<f32>::zeros(&[50]);
    w.uniform_(-0.5, 0.5, &mut rng);
    assert!(w.param_iter().all(|a| (-0.5..0.5).contains(&a) ));
  }

  #[test]
  fn randn_odd_length() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(Tensor::<f32>::randn_with(&[3,3], &mut rng).size(), 9);
  }

  #[test]
  fn display_truncates() {
    let x = Tensor::<f32>::zeros(&[10, 10]);
    let text = x.to_string();
    assert!(text.starts_with("Tensor[10, 10] ["));
    assert!(text.contains("..."));
    assert_eq!(text.lines().count(), 2 * EDGE_ITEMS + 3);
  }
}
