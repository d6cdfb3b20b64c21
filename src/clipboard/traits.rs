//! Clipboard backend trait.

use crate::error::ClipError;

/// Reads and writes clipboard text.
///
/// Calls are synchronous and may block on external processes or the
/// windowing system. The HTTP layer runs them on the blocking thread pool.
///
/// # Example
///
/// ```ignore
/// pub struct FixedClipboard;
///
/// impl ClipboardBackend for FixedClipboard {
///     fn name(&self) -> &'static str { "fixed" }
///     fn read(&self) -> Result<String, ClipError> { Ok("hello".to_string()) }
///     fn write(&self, _text: &str) -> Result<(), ClipError> { Ok(()) }
/// }
/// ```
pub trait ClipboardBackend: Send + Sync {
    /// Backend identifier used in logs.
    fn name(&self) -> &'static str;

    /// Current clipboard text.
    fn read(&self) -> Result<String, ClipError>;

    /// Replace the clipboard text.
    fn write(&self, text: &str) -> Result<(), ClipError>;
}
