//! Configuration module for clipd.
//!
//! Handles loading and validating configuration from TOML files.

mod settings;

pub use settings::*;
