//! Authentication module.
//!
//! Handles timestamp digests, the replay history of consumed timestamps,
//! and the authenticator combining both with a freshness window.

mod authenticator;
mod digest;
mod replay;

pub use authenticator::{unix_now, Authenticator};
pub use digest::{md5_hex, DigestScheme, Digester};
pub use replay::ReplayHistory;
