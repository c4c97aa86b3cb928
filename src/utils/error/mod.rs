//! Error handling for the accelerator
//!
//! Each component reports its own typed error; this module folds them into a
//! single crate-level error and a closed set of error kinds that callers can
//! branch on without string matching.

mod types;


pub use types::{AcceleratorError, ErrorKind, Result};
