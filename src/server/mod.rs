//! Server lifecycle module.
//!
//! Binds the TCP listener and drives startup, serving, and shutdown.

mod lifecycle;

pub use lifecycle::{Server, ServerState};
