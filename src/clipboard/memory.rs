//! In-process clipboard.

use std::sync::Mutex;

use crate::error::ClipError;

use super::ClipboardBackend;

/// Clipboard held in memory, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: Mutex<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(content.into()),
        }
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self) -> Result<String, ClipError> {
        Ok(self
            .content
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn write(&self, text: &str) -> Result<(), ClipError> {
        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = text.to_string();
        Ok(())
    }
}
