//! Feed-forward digit classifiers, built from scratch.
//! Small. Few dependencies. CPU only.
//!
//! # Features
//!
//! - **Strided tensors**: Tensors may be sliced, indexed, reshaped, transposed and
//! broadcasted without copying any data in most situations. Views share storage,
//! so in-place initializers write through to the layer owning a parameter.
//!
//! - **Module system**: Layers, activations and [nn::Sequential] containers
//! implement [nn::Module], exposing dotted parameter paths like `fc1.weight`
//! and a nested printout of the architecture.
//!
//! - **Digit data**: IDX files are parsed into [data::Mnist] and served in
//! shuffled batches by [data::DataLoader]. A synthetic set stands in when
//! no files are around.
//!
//! - **Persistence**: Parameters can be snapshotted into an [nn::StateDict]
//! and saved with `postcard`.
//!
//! # Examples
//!
//! One untrained forward pass:
//! ```
//! use digitnet::{ ops::*, Tensor, network::{ DigitClassifier, NetworkConfig } };
//! use digitnet::nn::Module;
//!
//! let model = DigitClassifier::<f32>::new(&NetworkConfig::default()).unwrap();
//! let images = Tensor::<f32>::randn(&[64, 1, 28, 28]);
//!
//! // Flatten images into rows and compute class probabilities
//! let probs = model.forward(&images.flatten_from(1));
//! assert_eq!(probs.shape().dims, vec![64, 10]);
//! ```
//!
//! Declarative composition:
//! ```
//! use digitnet::nn::{ Module, Sequential, Linear, ReLU, Softmax };
//!
//! let model = Sequential::<f32>::new()
//!   .with("fc1", Linear::new(784, 128)).unwrap()
//!   .with("relu1", ReLU).unwrap()
//!   .with("output", Linear::new(128, 10)).unwrap()
//!   .with("softmax", Softmax::new(1)).unwrap();
//!
//! assert!(model.parameter("fc1.weight").is_some());
//! println!("{model}");
//! ```

macro_rules! display_module {
  ($($type:ident),+) => {
    $(
      impl<T: $crate::scalar::Real> std::fmt::Display for $type<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
          write!(f, "{}", $crate::nn::Module::tree(self))
        }
      }
    )+
  };
}

mod internal;
mod shape;
mod tensor;
mod error;

pub mod ops;
pub mod scalar;
pub mod nn;
pub mod network;
pub mod data;
pub mod view;

pub use shape::Shape;
pub use tensor::{ Tensor, Summary };
pub use error::{ Error, Result };
