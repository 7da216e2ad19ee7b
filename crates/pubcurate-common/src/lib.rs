//! pubcurate-common: Shared error type and HTTP client used across all pubcurate crates.

pub mod error;
pub mod sandbox;

pub use error::{CurateError, Result};
