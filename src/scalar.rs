use rand::distributions::uniform::SampleUniform;
use num_traits::{ Num, NumCast, NumAssignOps };


/// All types that may be used in a [Tensor](crate::Tensor).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + Send + Sync + std::fmt::Debug {}
impl<T: PartialEq + Clone + Copy + Send + Sync + std::fmt::Debug> Inner for T {}


/// All numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Numeric: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum {}
impl<T: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum> Numeric for T {}


/// Floating point types that networks compute with.
///
/// Unlike the marker traits above, this one is implemented by hand for
/// [f32] and [f64], as each brings its own matrix multiplication kernel.
/// Layers holding real tensors can be boxed into containers, hence `'static`.

pub trait Real: Numeric + num_traits::Float + SampleUniform + 'static {
  /// Multiply the strided `m x k` matrix `a` with the strided `k x n` matrix `b`,
  /// writing the contiguous `m x n` result to `c`.
  fn gemm(m: usize, k: usize, n: usize, a: Strided<Self>, b: Strided<Self>, c: &mut [Self]);
}


/// A matrix living somewhere inside a flat buffer.

#[derive(Clone, Copy)]
pub struct Strided<'a, T> {
  pub data: &'a [T],
  pub offset: usize,
  pub row_stride: isize,
  pub col_stride: isize,
}

impl<T: Copy> Strided<'_, T> {
  #[inline]
  fn get(&self, row: usize, col: usize) -> T {
    let i = self.offset as isize + row as isize * self.row_stride + col as isize * self.col_stride;
    self.data[i as usize]
  }
}

#[cfg_attr(feature = "unsafe", allow(dead_code))]
fn naive_gemm<T: Numeric>(m: usize, k: usize, n: usize, a: Strided<T>, b: Strided<T>, c: &mut [T]) {
  for i in 0..m {
    for j in 0..n {
      let mut acc = T::zero();
      for p in 0..k {
        acc += a.get(i, p) * b.get(p, j);
      }
      c[i * n + j] = acc;
    }
  }
}

macro_rules! impl_real {
  ($type:ty, $kernel:ident) => {
    impl Real for $type {
      #[cfg(feature = "unsafe")]
      fn gemm(m: usize, k: usize, n: usize, a: Strided<Self>, b: Strided<Self>, c: &mut [Self]) {
        debug_assert_eq!(c.len(), m * n);
        if m == 0 || n == 0 { return }
        if k == 0 {
          c.iter_mut().for_each(|x| *x = 0.0 );
          return
        }
        // Both matrices were bounds checked by their tensors' shapes
        unsafe {
          matrixmultiply::$kernel(
            m, k, n,
            1.0,
            a.data.as_ptr().add(a.offset), a.row_stride, a.col_stride,
            b.data.as_ptr().add(b.offset), b.row_stride, b.col_stride,
            0.0,
            c.as_mut_ptr(), n as isize, 1,
          );
        }
      }

      #[cfg(not(feature = "unsafe"))]
      fn gemm(m: usize, k: usize, n: usize, a: Strided<Self>, b: Strided<Self>, c: &mut [Self]) {
        naive_gemm(m, k, n, a, b, c)
      }
    }
  };
}

impl_real!(f32, sgemm);
impl_real!(f64, dgemm);


#[cfg(test)]
mod tests {
  use super::*;

  fn matrix<T>(data: &[T], cols: usize) -> Strided<T> {
    Strided { data, offset: 0, row_stride: cols as isize, col_stride: 1 }
  }

  #[test]
  fn kernel_matches_naive() {
    let a: Vec<f32> = (0..6).map(|i| i as f32 ).collect();
    let b: Vec<f32> = (0..12).map(|i| i as f32 * 0.5 ).collect();
    let mut fast = vec![0.0; 8];
    let mut slow = vec![0.0; 8];
    f32::gemm(2, 3, 4, matrix(&a, 3), matrix(&b, 4), &mut fast);
    naive_gemm(2, 3, 4, matrix(&a, 3), matrix(&b, 4), &mut slow);
    assert_eq!(fast, slow);
  }

  #[test]
  fn transposed_operand() {
    // [[1,2],[3,4]] read column-first is its transpose
    let a = [1.0f64, 2.0, 3.0, 4.0];
    let t = Strided { data: &a[..], offset: 0, row_stride: 1, col_stride: 2 };
    let eye = [1.0, 0.0, 0.0, 1.0];
    let mut out = vec![0.0; 4];
    f64::gemm(2, 2, 2, t, matrix(&eye, 2), &mut out);
    assert_eq!(out, vec![1.0, 3.0, 2.0, 4.0]);
  }
}
