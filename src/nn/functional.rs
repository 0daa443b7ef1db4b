//! Stateless counterparts of the activation modules, for networks
//! that keep only their weighted layers as fields.

use crate::{ ops::*, scalar::Real, Tensor };


pub fn linear<T: Real>(input: &Tensor<T>, weight: &Tensor<T>, bias: Option<&Tensor<T>>) -> Tensor<T> {
  let out = input.mm(&weight.transpose(0, 1));
  match bias {
    Some(bias) => out + bias,
    None => out,
  }
}

pub fn sigmoid<T: Real>(input: &Tensor<T>) -> Tensor<T> {
  input.sigmoid()
}

pub fn relu<T: Real>(input: &Tensor<T>) -> Tensor<T> {
  input.relu()
}

pub fn softmax<T: Real>(input: &Tensor<T>, dim: isize) -> Tensor<T> {
  input.softmax(dim)
}
