//! Error types for clipd.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
