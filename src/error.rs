use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("bad signature, expected {0:?}")]
    Signature(&'static str),
    #[error("malformed data: {0}")]
    Malformed(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },
}
