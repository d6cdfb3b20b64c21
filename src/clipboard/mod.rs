//! Clipboard backends.
//!
//! The HTTP layer only sees [`ClipboardBackend`]; which implementation
//! serves it is chosen from the configuration.

mod command;
mod memory;
#[cfg(feature = "system-clipboard")]
mod system;
mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use command::CommandClipboard;
pub use memory::MemoryClipboard;
#[cfg(feature = "system-clipboard")]
pub use system::SystemClipboard;
pub use traits::ClipboardBackend;

use crate::config::{BackendKind, ClipboardConfig};
use crate::error::ClipError;

/// Build the backend selected in the configuration.
pub fn from_config(config: &ClipboardConfig) -> Result<Arc<dyn ClipboardBackend>, ClipError> {
    match config.backend {
        BackendKind::Command => Ok(Arc::new(CommandClipboard::new(
            config.read_command.clone(),
            config.write_command.clone(),
            Duration::from_secs(config.timeout_seconds),
        ))),
        BackendKind::Memory => Ok(Arc::new(MemoryClipboard::new())),
        #[cfg(feature = "system-clipboard")]
        BackendKind::System => Ok(Arc::new(SystemClipboard::new())),
        #[cfg(not(feature = "system-clipboard"))]
        BackendKind::System => Err(ClipError::Config {
            message: "clipd was built without the system-clipboard feature".to_string(),
        }),
    }
}
