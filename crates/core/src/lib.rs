//! Core types shared by every piece of the kvengine workspace.
//!
//! This crate defines the foundational, I/O-free vocabulary the rest of
//! the workspace builds on:
//! - [`Status`]: the closed outcome taxonomy every fallible operation returns.
//! - [`Error`]: the error type carrying a `Status` plus a diagnostic message.
//! - [`Key`] / [`Value`]: owned byte-string storage for records.
//! - [`Comparator`]: the total order engines use to sort keys.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod comparator;
pub mod error;
pub mod limits;
pub mod types;

pub use comparator::{BinaryComparator, Comparator};
pub use error::{Error, Result, Status};
pub use limits::Limits;
pub use types::{Key, Value};
