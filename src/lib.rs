//! clipd library
//!
//! Shares the local clipboard over HTTP. Requests carry a timestamp and a
//! digest of that timestamp under a shared secret; timestamps are only
//! accepted while fresh and only once.

pub mod auth;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod server;
