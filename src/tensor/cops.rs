#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
  tensor::Tensor,
  shape::Shape,
  error::{ Error, Result },
  scalar::{ Real, Strided },
};


impl<T: Real> Tensor<T> {
  /// Matrix product over the last two dimensions.
  ///
  /// Leading (batch) dimensions get broadcast against each other.
  /// A vector on the left is treated as a single row, a vector on
  /// the right as a single column, and the padded dimension is
  /// removed from the result again.

  pub fn try_mm(&self, rhs: &Self) -> Result<Self> {
    if self.rank() == 0 || rhs.rank() == 0 {
      return Err(Error::shape(format!("Cannot multiply scalars {} & {}", self.shape, rhs.shape)))
    }
    let pad_l = self.rank() == 1;
    let pad_r = rhs.rank() == 1;
    let lhs = if pad_l { self.unsqueeze_view(0) } else { self.clone() };
    let rhs = if pad_r { rhs.unsqueeze_view(-1) } else { rhs.clone() };

    let (m, k) = (lhs.shape[-2], lhs.shape[-1]);
    let (k_r, n) = (rhs.shape[-2], rhs.shape[-1]);
    if k != k_r {
      return Err(Error::shape(format!("Cannot multiply {} with {}", self.shape, rhs.shape)))
    }

    let data = {
      let data_l = lhs.raw();
      let data_r = rhs.raw();
      if lhs.rank() == 2 && rhs.rank() == 2 {
        let mut out = vec![T::zero(); m * n];
        T::gemm(m, k, n, lhs.matrix(&data_l[..], 0), rhs.matrix(&data_r[..], 0), &mut out);
        out
      } else {
        batched((&lhs, &data_l[..]), (&rhs, &data_r[..]), m, k, n)?
      }
    };

    let batch = Shape::new(&lhs.shape.dims[..lhs.rank() - 2])
      .broadcast(&Shape::new(&rhs.shape.dims[..rhs.rank() - 2]))?;
    let mut dims = batch.dims;
    if !pad_l { dims.push(m) }
    if !pad_r { dims.push(n) }
    Ok(Self::new(&dims, data))
  }

  fn unsqueeze_view(&self, dim: isize) -> Self {
    Self { shape: self.shape.unsqueeze(dim), data: self.data.clone() }
  }

  // Window onto the matrix starting `shift` elements past our offset
  fn matrix<'a>(&self, data: &'a [T], shift: usize) -> Strided<'a, T> {
    Strided {
      data,
      offset: self.shape.offset + shift,
      row_stride: self.shape.strides[self.rank() - 2],
      col_stride: self.shape.strides[self.rank() - 1],
    }
  }
}

fn batched<T: Real>(
  (lhs, data_l): (&Tensor<T>, &[T]),
  (rhs, data_r): (&Tensor<T>, &[T]),
  m: usize, k: usize, n: usize,
) -> Result<Vec<T>> {
  let batch_l = lhs.shape.leading(lhs.rank() - 2);
  let batch_r = rhs.shape.leading(rhs.rank() - 2);
  let layout_l = batch_l.broadcast(&batch_r)?;
  let layout_r = batch_r.broadcast(&layout_l)?;

  let pairs: Vec<_> = layout_l.iter()
    .zip(layout_r.iter())
    .map(|(l, r)| (lhs.matrix(data_l, l), rhs.matrix(data_r, r)) )
    .collect();

  let mut data = vec![T::zero(); pairs.len() * m * n];

  #[cfg(feature = "rayon")]
  data.par_chunks_mut((m * n).max(1))
    .zip(pairs.par_iter())
    .for_each(|(out, (a, b))| T::gemm(m, k, n, *a, *b, out) );

  #[cfg(not(feature = "rayon"))]
  data.chunks_mut((m * n).max(1))
    .zip(pairs.iter())
    .for_each(|(out, (a, b))| T::gemm(m, k, n, *a, *b, out) );

  Ok(data)
}
