pub use mint;

pub mod common;
mod error;

pub mod palette;
pub mod raw;
pub mod registry;
pub mod xld;

pub use error::{Error, Result};
