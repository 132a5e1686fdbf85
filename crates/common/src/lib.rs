//! Shared error definitions used across all gatehouse crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
