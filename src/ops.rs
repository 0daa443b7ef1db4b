use num_traits::NumOps;

use crate::internal::*;
use crate::Shape;
use crate::scalar::{ Inner, Numeric, Real };


/// Shape manipulation, available for tensors of any [Inner] type.

pub trait BaseOps<I: Inner>: Clone {
  fn scalar(item: I) -> Self;
  fn fill(shape: &[usize], filler: I) -> Self;
  fn shape(&self) -> &Shape;
  fn reshape(&self, dims: &[usize]) -> Self;
  fn unsqueeze(&self, dim: isize) -> Self;
  fn transpose(&self, dim1: isize, dim2: isize) -> Self;

  fn dim(&self, dim: isize) -> usize {
    self.shape()[dim]
  }
}


/// Arithmetic reductions for [Numeric] inner types.
///
/// Reductions collapse the given dimension *and all dimensions behind it*,
/// so `sum(-1)` on a `[64, 10]` tensor yields one value per row.

pub trait NumericOps<I: Numeric>: NumOps + NumOps<I, Self> + Sized {
  fn sum(&self, dim: isize) -> Self;
  fn max(&self, dim: isize) -> Self;
  fn min(&self, dim: isize) -> Self;
}


/// Elementwise functions of [Real] numbers and matrix multiplication.

pub trait RealOps<I: Real> {
  fn mm(&self, rhs: &Self) -> Self;
  fn exp(&self) -> Self;
  fn log(&self) -> Self;
  fn sigmoid(&self) -> Self;
  fn relu(&self) -> Self;
}


/// High-level operations, implemented exclusively on top of
/// the lower level operation traits.

pub trait Hops<I>: BaseOps<I> + NumericOps<I> + RealOps<I>
where
  I: Real,
  for<'a> &'a Self: NumOps<&'a Self, Self> + NumOps<I, Self>,
{
  fn mean(&self, dim: isize) -> Self {
    let udim = negative_index(dim, self.shape().rank(), false);
    let n: usize = self.shape().dims[udim..].iter().product();
    self.sum(dim) / I::from(n).unwrap()
  }

  /// Turn scores into probabilities along `dim`.
  /// The maximum gets subtracted first, so large scores don't overflow.

  fn softmax(&self, dim: isize) -> Self {
    let exp = (self - &self.keep_dims(&self.max(dim), dim)).exp();
    &exp / &exp.keep_dims(&exp.sum(dim), dim)
  }

  fn log_softmax(&self, dim: isize) -> Self {
    let shifted = self - &self.keep_dims(&self.max(dim), dim);
    &shifted - &shifted.keep_dims(&shifted.exp().sum(dim).log(), dim)
  }

  /// Give the result of reducing `self` along `dim` back the collapsed
  /// dimensions with size one, so it broadcasts against `self`.

  fn keep_dims(&self, reduced: &Self, dim: isize) -> Self {
    let rank = self.shape().rank();
    let udim = negative_index(dim, rank, false);
    let mut dims = self.shape().dims[..udim].to_vec();
    dims.resize(rank, 1);
    reduced.reshape(&dims)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::Tensor;

  #[test]
  fn mean() {
    let a = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]);
    assert_eq!(a.mean(0), Tensor::scalar(3.5));
    assert_eq!(a.mean(-1), Tensor::vec(&[1.5, 3.5, 5.5]));
  }

  #[test]
  fn softmax_rows_sum_to_one() {
    let a = Tensor::<f64>::arrange(&[4,10], -3.0, 0.7).softmax(1);
    assert_eq!(a.shape().dims, vec![4,10]);
    for total in a.sum(-1).to_vec() {
      assert!((total - 1.0).abs() < 1e-12);
    }
  }

  #[test]
  fn softmax_large_scores() {
    let a = Tensor::<f32>::vec(&[1000.0, 1000.0]).unsqueeze(0).softmax(1);
    assert_eq!(a.to_vec(), vec![0.5, 0.5]);
  }

  #[test]
  fn softmax_keeps_rank() {
    let a = Tensor::<f64>::ones(&[2,1,10]).softmax(1);
    assert_eq!(a.shape().dims, vec![2,1,10]);
    assert!(a.to_vec().iter().all(|&p| (p - 0.1).abs() < 1e-12 ));

    // Everything from dim 1 on forms one distribution per leading index
    let b = Tensor::<f64>::arrange(&[3,4,5], -2.0, 0.1).softmax(1);
    assert_eq!(b.shape().dims, vec![3,4,5]);
    for total in b.sum(1).to_vec() {
      assert!((total - 1.0).abs() < 1e-12);
    }
    assert_eq!(Tensor::<f32>::zeros(&[3,4,5]).log_softmax(1).shape().dims, vec![3,4,5]);
  }

  #[test]
  fn log_softmax_matches_softmax() {
    let a = Tensor::<f64>::new(&[2,3], vec![0.1, 2.0, -1.0, 3.0, 3.0, 0.0]);
    let direct = a.softmax(1).log().to_vec();
    let stable = a.log_softmax(1).to_vec();
    for (x, y) in direct.iter().zip(&stable) {
      assert!((x - y).abs() < 1e-12);
    }
  }
}
