//! Native clipboard via arboard.

use std::sync::Mutex;

use arboard::Clipboard;
use tracing::debug;

use crate::error::{ClipError, ClipboardErrorKind};

use super::ClipboardBackend;

/// Clipboard of the current desktop session.
///
/// On X11 and Wayland the selection is served by the handle that set it, so
/// one handle is opened on first use and kept for the life of the backend.
/// A handle that reports an error is dropped and reopened on the next call.
pub struct SystemClipboard {
    handle: Mutex<Option<Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    fn with_handle<T>(
        &self,
        operation: impl FnOnce(&mut Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, arboard::Error> {
        let mut guard = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        let clipboard = match guard.take() {
            Some(clipboard) => clipboard,
            None => {
                debug!("Opening system clipboard");
                Clipboard::new()?
            }
        };
        let clipboard = guard.insert(clipboard);

        let result = operation(clipboard);
        match &result {
            Ok(_) | Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => {
                debug!(error = %e, "Dropping system clipboard handle");
                *guard = None;
            }
        }
        result
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardBackend for SystemClipboard {
    fn name(&self) -> &'static str {
        "system"
    }

    fn read(&self) -> Result<String, ClipError> {
        text_or_empty(self.with_handle(|clipboard| clipboard.get_text()))
    }

    fn write(&self, text: &str) -> Result<(), ClipError> {
        self.with_handle(|clipboard| clipboard.set_text(text.to_string()))
            .map_err(unavailable)
    }
}

/// An empty clipboard reads as empty text.
fn text_or_empty(result: Result<String, arboard::Error>) -> Result<String, ClipError> {
    match result {
        Ok(text) => Ok(text),
        Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
        Err(e) => Err(unavailable(e)),
    }
}

fn unavailable(error: arboard::Error) -> ClipError {
    ClipError::Clipboard {
        kind: ClipboardErrorKind::Unavailable {
            message: error.to_string(),
        },
    }
}
