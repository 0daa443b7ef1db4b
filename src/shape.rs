use std::ops::Range;

use serde::{ Serialize, Deserialize };

use crate::{
  internal::*,
  error::{ Error, Result },
};


/// Dimensions and memory layout of a [Tensor](crate::Tensor).
///
/// Views like [take](Shape::take), [transpose](Shape::transpose) or
/// [broadcast](Shape::broadcast) only change strides and offset,
/// never the underlying storage.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
  pub(crate) strides: Vec<isize>,
  pub(crate) offset: usize,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self {
      dims: dims.to_vec(),
      strides: Self::row_major(dims),
      offset: 0,
    }
  }

  fn row_major(dims: &[usize]) -> Vec<isize> {
    let mut strides = vec![1; dims.len()];
    for i in (1..dims.len()).rev() {
      strides[i - 1] = strides[i] * dims[i] as isize;
    }
    strides
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  /// Whether every element lies within a storage buffer of length `len`.
  /// Shapes read from files are not trusted to.

  pub(crate) fn fits(&self, len: usize) -> bool {
    if self.dims.len() != self.strides.len() { return false }
    match self.dims.iter().try_fold(1usize, |size, &n| size.checked_mul(n) ) {
      None => return false,
      Some(0) => return true,
      Some(_) => {},
    }
    let last = self.dims.iter()
      .zip(&self.strides)
      .try_fold(self.offset, |last, (&n, &s)| {
        let s = usize::try_from(s).ok()?;
        last.checked_add((n - 1).checked_mul(s)?)
      });
    matches!(last, Some(last) if last < len)
  }

  /// Storage position of the element at `indices`.
  /// Missing trailing indices count as zero.

  pub(crate) fn index(&self, indices: &[usize]) -> usize {
    debug_assert!(indices.len() <= self.rank());
    let rel: isize = indices.iter()
      .zip(&self.strides)
      .map(|(&i, &s)| i as isize * s )
      .sum();
    (self.offset as isize + rel) as usize
  }

  /// Whether elements lie densely in row-major order.
  /// Strides of size-one dimensions don't matter.

  pub fn contiguous(&self) -> bool {
    self.dims.iter()
      .zip(&self.strides)
      .zip(Self::row_major(&self.dims))
      .all(|((&n, &s), expected)| n == 1 || s == expected )
  }

  /// Storage positions of all elements in logical order.

  pub fn iter(&self) -> Box<dyn Iterator<Item=usize> + '_> {
    if self.contiguous() {
      Box::new(self.offset..self.offset + self.size())
    } else {
      Box::new(ShapeIterator::new(self))
    }
  }

  /// Reinterpret contiguous memory with new dimensions.
  /// A single `0` acts as placeholder for whatever size remains.

  pub fn view(&self, dims: &[usize]) -> Result<Self> {
    if !self.contiguous() {
      return Err(Error::shape(format!("Cannot view non-contiguous {self}")))
    }
    let placeholders = dims.iter().filter(|&&n| n == 0 ).count();
    if placeholders > 1 {
      return Err(Error::shape(format!("View {dims:?} has more than one placeholder")))
    }
    let known: usize = dims.iter().filter(|&&n| n != 0 ).product();
    let dims: Vec<usize> = if placeholders == 1 {
      if known == 0 || self.size() % known != 0 {
        return Err(Error::shape(format!("Cannot infer placeholder in {dims:?} for {self}")))
      }
      dims.iter().map(|&n| if n == 0 { self.size() / known } else { n } ).collect()
    } else {
      dims.to_vec()
    };
    if dims.iter().product::<usize>() != self.size() {
      return Err(Error::shape(format!("Cannot view {self} as {dims:?}")))
    }
    let strides = Self::row_major(&dims);
    Ok(Self { dims, strides, offset: self.offset })
  }

  /// Fix the leading dimensions to `indices`.

  pub fn take(&self, indices: &[usize]) -> Self {
    for (d, &i) in indices.iter().enumerate() {
      assert!(i < self.dims[d], "Index {i} out of bounds for dim {d} of {self}");
    }
    Self {
      dims: self.dims[indices.len()..].to_vec(),
      strides: self.strides[indices.len()..].to_vec(),
      offset: self.index(indices),
    }
  }

  /// The leading `n` dimensions with their strides, relative to offset zero.

  pub(crate) fn leading(&self, n: usize) -> Self {
    Self {
      dims: self.dims[..n].to_vec(),
      strides: self.strides[..n].to_vec(),
      offset: 0,
    }
  }

  pub fn range(&self, ranges: &[Range<isize>]) -> Self {
    let mut shape = self.clone();
    for (d, range) in ranges.iter().enumerate() {
      let start = negative_index(range.start, self.dims[d], true);
      let end = negative_index(range.end, self.dims[d], true).min(self.dims[d]);
      assert!(start <= end, "Empty range {range:?} for dim {d} of {self}");
      shape.offset = (shape.offset as isize + self.strides[d] * start as isize) as usize;
      shape.dims[d] = end - start;
    }
    shape
  }

  /// Remove all dimensions of size one.

  pub fn squeeze(&self) -> Self {
    let (dims, strides): (Vec<usize>, Vec<isize>) = self.dims.iter()
      .zip(&self.strides)
      .filter(|(&n, _)| n != 1 )
      .map(|(&n, &s)| (n, s) )
      .unzip();
    Self { dims, strides, offset: self.offset }
  }

  pub fn unsqueeze(&self, dim: isize) -> Self {
    let d = negative_index(dim, self.rank(), true);
    let stride = if d < self.rank() {
      self.strides[d] * self.dims[d] as isize
    } else { 1 };
    let mut shape = self.clone();
    shape.dims.insert(d, 1);
    shape.strides.insert(d, stride);
    shape
  }

  /// Stretch dimensions of size one, and prepend missing ones,
  /// so that `self` lines up with `other`. Stretched dimensions get
  /// a stride of zero, repeating their data.

  pub fn broadcast(&self, other: &Self) -> Result<Self> {
    let rank = self.rank().max(other.rank());
    let mut dims = vec![0; rank];
    let mut strides = vec![0; rank];
    for i in 0..rank {
      let mine = if i < self.rank() { Some(self.rank() - 1 - i) } else { None };
      let theirs = if i < other.rank() { other.dims[other.rank() - 1 - i] } else { 1 };
      let (n, stride) = match mine {
        Some(d) => (self.dims[d], self.strides[d]),
        None => (1, 0),
      };
      let out = rank - 1 - i;
      if n == theirs || theirs == 1 {
        dims[out] = n;
        strides[out] = stride;
      } else if n == 1 {
        dims[out] = theirs;
        strides[out] = 0;
      } else {
        return Err(Error::shape(format!("Could not broadcast {self} & {other}")))
      }
    }
    Ok(Self { dims, strides, offset: self.offset })
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    let dim1 = negative_index(dim1, self.rank(), false);
    let dim2 = negative_index(dim2, self.rank(), false);
    let mut shape = self.clone();
    shape.dims.swap(dim1, dim2);
    shape.strides.swap(dim1, dim2);
    shape
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  fn index(&self, i: isize) -> &usize {
    &self.dims[negative_index(i, self.rank(), false)]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


/// Walk a strided [Shape] like an odometer.

pub struct ShapeIterator<'a> {
  shape: &'a Shape,
  counter: Vec<usize>,
  position: isize,
  remaining: usize,
}

impl<'a> ShapeIterator<'a> {
  fn new(shape: &'a Shape) -> Self {
    Self {
      shape,
      counter: vec![0; shape.rank()],
      position: shape.offset as isize,
      remaining: shape.size(),
    }
  }
}

impl Iterator for ShapeIterator<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    if self.remaining == 0 { return None }
    self.remaining -= 1;
    let out = self.position as usize;
    for d in (0..self.counter.len()).rev() {
      self.counter[d] += 1;
      self.position += self.shape.strides[d];
      if self.counter[d] < self.shape.dims[d] { break }
      // Wrap this digit and carry into the next one
      self.position -= self.shape.strides[d] * self.shape.dims[d] as isize;
      self.counter[d] = 0;
    }
    Some(out)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strides() {
    assert_eq!(Shape::new(&[64,1,28,28]).strides, vec![784,784,28,1]);
    assert_eq!(Shape::new(&[]).strides, Vec::<isize>::new());
  }

  #[test]
  fn fits_storage() {
    let shape = Shape::new(&[2,3]);
    assert!(shape.fits(6));
    assert!(!shape.fits(5));
    assert!(Shape::new(&[0,3]).fits(0));
    assert!(shape.transpose(0, 1).fits(6));
    let broadcast = Shape::new(&[3]).broadcast(&Shape::new(&[4,3])).unwrap();
    assert!(broadcast.fits(3));

    let corrupt = Shape { dims: vec![2,3], strides: vec![3], offset: 0 };
    assert!(!corrupt.fits(6));
    let offset = Shape { offset: 1, ..Shape::new(&[2,3]) };
    assert!(!offset.fits(6));
    let huge = Shape { dims: vec![usize::MAX, 2], strides: vec![2, 1], offset: 0 };
    assert!(!huge.fits(usize::MAX));
  }

  #[test]
  fn index() {
    let shape = Shape::new(&[2,3]);
    assert_eq!(shape.index(&[0]), 0);
    assert_eq!(shape.index(&[1,2]), 5);
  }

  #[test]
  fn view_placeholder() {
    let shape = Shape::new(&[64,1,28,28]);
    assert_eq!(shape.view(&[64, 0]).unwrap().dims, vec![64, 784]);
    assert_eq!(Shape::new(&[64]).view(&[0, 1]).unwrap().dims, vec![64, 1]);
    assert!(shape.view(&[0, 0]).is_err());
    assert!(shape.view(&[63, 0]).is_err());
    assert!(shape.view(&[10, 10]).is_err());
  }

  #[test]
  fn view_requires_contiguous() {
    let shape = Shape::new(&[2,3]).transpose(0, 1);
    assert!(shape.view(&[6]).is_err());
  }

  #[test]
  fn take() {
    let shape = Shape::new(&[64,1,28,28]).take(&[3]);
    assert_eq!(shape.dims, vec![1,28,28]);
    assert_eq!(shape.offset, 3 * 784);
  }

  #[test]
  fn iterate_transposed() {
    let shape = Shape::new(&[2,3]).transpose(0, 1);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![0, 3, 1, 4, 2, 5]);
  }

  #[test]
  fn range() {
    let shape = Shape::new(&[4,4,4]).range(&[1..3, 1..3, 1..3]);
    assert_eq!(shape.dims, vec![2,2,2]);
    assert_eq!(shape.offset, 21);
    let indices: Vec<_> = shape.iter().collect();
    assert_eq!(indices, vec![21, 22, 25, 26, 37, 38, 41, 42]);
  }

  #[test]
  fn squeeze_unsqueeze() {
    let shape = Shape::new(&[1,2,1,3]).squeeze();
    assert_eq!(shape.dims, vec![2,3]);
    assert_eq!(shape.strides, vec![3,1]);

    let shape = Shape::new(&[64]).unsqueeze(-1);
    assert_eq!(shape.dims, vec![64,1]);
    assert_eq!(shape.strides, vec![1,1]);

    let shape = Shape::new(&[2,3]).unsqueeze(0);
    assert_eq!(shape.dims, vec![1,2,3]);
    assert_eq!(shape.strides, vec![6,3,1]);
  }

  #[test]
  fn broadcast_bias() {
    // Bias [256] against activations [64,256]
    let shape = Shape::new(&[256]).broadcast(&Shape::new(&[64,256])).unwrap();
    assert_eq!(shape.dims, vec![64,256]);
    assert_eq!(shape.strides, vec![0,1]);
  }

  #[test]
  fn broadcast_column() {
    let shape = Shape::new(&[64,1]).broadcast(&Shape::new(&[64,10])).unwrap();
    assert_eq!(shape.dims, vec![64,10]);
    assert_eq!(shape.strides, vec![1,0]);
    let indices: Vec<_> = Shape::new(&[2,1]).broadcast(&Shape::new(&[2,3])).unwrap().iter().collect();
    assert_eq!(indices, vec![0, 0, 0, 1, 1, 1]);
  }

  #[test]
  fn broadcast_mismatch() {
    assert!(Shape::new(&[3]).broadcast(&Shape::new(&[2,4])).is_err());
  }

  #[test]
  fn transpose() {
    let shape = Shape::new(&[2,3]).transpose(0,1);
    assert_eq!(shape.dims, vec![3,2]);
    assert_eq!(shape.strides, vec![1,3]);
    assert_eq!(shape.index(&[1,1]), 4);
  }
}
