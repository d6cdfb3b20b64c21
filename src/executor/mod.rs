//! Command executor module.
//!
//! Handles subprocess spawning with stdin input and execution timeouts.

mod subprocess;

pub use subprocess::{summarize_output, SubprocessBuilder, SubprocessResult};
