//! Core types for the mvccdb engine: the error hierarchy and the
//! length-checked byte-string primitives shared by the store and
//! concurrency crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bytes;
pub mod error;

pub use bytes::{KeyBytes, ValueBytes, MAX_LEN};
pub use error::{Error, Result};
