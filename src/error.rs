use std::fmt;
use std::io;


/// Everything that can go wrong while loading data,
/// shaping tensors or moving parameters to and from disc.

#[derive(Debug)]
pub enum Error {
  Io(io::Error),
  Format(String),
  Shape(String),
  Serialize(postcard::Error),
  Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  pub(crate) fn shape(msg: impl Into<String>) -> Self {
    Self::Shape(msg.into())
  }

  pub(crate) fn format(msg: impl Into<String>) -> Self {
    Self::Format(msg.into())
  }

  pub(crate) fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Io(err) => write!(f, "I/O error: {err}"),
      Self::Format(msg) => write!(f, "Malformed data: {msg}"),
      Self::Shape(msg) => write!(f, "Shape mismatch: {msg}"),
      Self::Serialize(err) => write!(f, "Could not (de)serialize: {err}"),
      Self::Config(msg) => write!(f, "Invalid configuration: {msg}"),
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(err) => Some(err),
      Self::Serialize(err) => Some(err),
      _ => None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl From<postcard::Error> for Error {
  fn from(err: postcard::Error) -> Self {
    Self::Serialize(err)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display() {
    let err = Error::shape("Shape[2, 3] vs Shape[4]");
    assert_eq!(err.to_string(), "Shape mismatch: Shape[2, 3] vs Shape[4]");
  }

  #[test]
  fn io_source() {
    let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.to_string().starts_with("I/O error"));
  }
}
