use crate::{
  shape::Shape,
  tensor::Tensor,
  scalar::{ Inner, Numeric, Real },
  ops::{ BaseOps, NumericOps, RealOps },
};


impl<T: Inner> BaseOps<T> for Tensor<T> {
  fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  fn shape(&self) -> &Shape {
    &self.shape
  }

  /// Like [view](Tensor::view), but copies non-contiguous tensors first.

  fn reshape(&self, dims: &[usize]) -> Self {
    self.contiguous().view(dims)
  }

  fn unsqueeze(&self, dim: isize) -> Self {
    Self { shape: self.shape.unsqueeze(dim), data: self.data.clone() }
  }

  fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    Self { shape: self.shape.transpose(dim1, dim2), data: self.data.clone() }
  }
}

fn extreme<T: Numeric>(values: &[T], better: impl Fn(T, T) -> bool) -> T {
  assert!(!values.is_empty(), "Cannot reduce an empty dimension");
  values[1..].iter().fold(values[0], |best, &a| if better(a, best) { a } else { best } )
}

impl<T: Numeric> NumericOps<T> for Tensor<T> {
  fn sum(&self, dim: isize) -> Self {
    self.collapse(dim, |values| values.iter().copied().sum() )
  }

  fn max(&self, dim: isize) -> Self {
    self.collapse(dim, |values| extreme(values, |a, b| a > b ) )
  }

  fn min(&self, dim: isize) -> Self {
    self.collapse(dim, |values| extreme(values, |a, b| a < b ) )
  }
}

impl<T: Real> RealOps<T> for Tensor<T> {
  fn mm(&self, rhs: &Self) -> Self {
    self.try_mm(rhs).unwrap_or_else(|err| panic!("{err}") )
  }

  fn exp(&self) -> Self {
    self.vectorize(|a| a.exp() )
  }

  fn log(&self) -> Self {
    self.vectorize(|a| a.ln() )
  }

  fn sigmoid(&self) -> Self {
    self.vectorize(|a| T::one() / (T::one() + (-a).exp()) )
  }

  fn relu(&self) -> Self {
    self.vectorize(|a| a.max(T::zero()) )
  }
}

impl<T: Real> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    self.vectorize(|a| -a )
  }
}

impl<T: Real> std::ops::Neg for Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $symbol:tt) => {
    impl<T: Numeric> std::ops::$trait for &Tensor<T> { // &tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        Tensor::$meth(self, rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        Tensor::$meth(&self, &rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<Tensor<T>> for &Tensor<T> { // &tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Tensor<T>) -> Tensor<T> {
        Tensor::$meth(self, &rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        Tensor::$meth(&self, rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        Tensor::$meth(self, &Tensor::scalar(rhs))
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        Tensor::$meth(&self, &Tensor::scalar(rhs))
      }
    }

    impl std::ops::$trait<&Tensor<f32>> for f32 { // f32 * &tensor
      type Output = Tensor<f32>;

      fn $meth(self, tensor: &Tensor<f32>) -> Tensor<f32> {
        Tensor::scalar(self) $symbol tensor
      }
    }

    impl std::ops::$trait<Tensor<f32>> for f32 { // f32 * tensor
      type Output = Tensor<f32>;

      fn $meth(self, tensor: Tensor<f32>) -> Tensor<f32> {
        Tensor::scalar(self) $symbol &tensor
      }
    }

    impl std::ops::$trait<&Tensor<f64>> for f64 { // f64 * &tensor
      type Output = Tensor<f64>;

      fn $meth(self, tensor: &Tensor<f64>) -> Tensor<f64> {
        Tensor::scalar(self) $symbol tensor
      }
    }

    impl std::ops::$trait<Tensor<f64>> for f64 { // f64 * tensor
      type Output = Tensor<f64>;

      fn $meth(self, tensor: Tensor<f64>) -> Tensor<f64> {
        Tensor::scalar(self) $symbol &tensor
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);
add_operator!(Rem, rem, %);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sum() {
    let a = Tensor::new(&[3,2], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(a.sum(0), Tensor::scalar(21));
    assert_eq!(a.sum(-1), Tensor::vec(&[3, 7, 11]));
  }

  #[test]
  fn max_min() {
    let a = Tensor::new(&[2,3], vec![1., -2., 3., -4., 5., -6.]);
    assert_eq!(a.max(1), Tensor::vec(&[3., 5.]));
    assert_eq!(a.min(1), Tensor::vec(&[-2., -6.]));
    assert_eq!(a.transpose(0, 1).max(1), Tensor::vec(&[1., 5., 3.]));
  }

  #[test]
  fn activations() {
    let a = Tensor::vec(&[-1.0f64, 0.0, 2.0]);
    assert_eq!(a.relu(), Tensor::vec(&[0.0, 0.0, 2.0]));
    assert_eq!(a.sigmoid().at(&[1]).item(), 0.5);
    let s = a.sigmoid().to_vec();
    assert!((s[0] - 1.0 / (1.0 + 1.0f64.exp())).abs() < 1e-12);
    assert!(a.exp().log().to_vec().iter().zip(a.to_vec()).all(|(x, y)| (x - y).abs() < 1e-12 ));
  }

  #[test]
  fn operators() {
    let a = Tensor::vec(&[1.0f32, 2.0]);
    let b = Tensor::vec(&[3.0f32, 4.0]);
    assert_eq!(&a + &b, Tensor::vec(&[4.0, 6.0]));
    assert_eq!(a.clone() * 2.0, Tensor::vec(&[2.0, 4.0]));
    assert_eq!(1.0 - &a, Tensor::vec(&[0.0, -1.0]));
    assert_eq!(-&b, Tensor::vec(&[-3.0, -4.0]));
    assert_eq!(b / a, Tensor::vec(&[3.0, 2.0]));
  }

  #[test]
  fn remainder() {
    let a = Tensor::new(&[2,2], vec![5.0f64, 7.0, -3.0, 9.0]);
    let b = Tensor::vec(&[2.0, 4.0]);
    assert_eq!(&a % &b, Tensor::new(&[2,2], vec![1.0, 3.0, -1.0, 1.0]));
    assert_eq!(a % 3.0, Tensor::new(&[2,2], vec![2.0, 1.0, 0.0, 0.0]));
  }
}
