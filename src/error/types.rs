//! Error types for clipd.

use thiserror::Error;

/// Main error type for the clipboard server.
#[derive(Error, Debug)]
pub enum ClipError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Listener and lifecycle errors.
    #[error("Server error: {message}")]
    Server { message: String },

    /// Authentication errors.
    #[error("Authentication error: {kind}")]
    Auth { kind: AuthErrorKind },

    /// Clipboard backend errors.
    #[error("Clipboard error: {kind}")]
    Clipboard { kind: ClipboardErrorKind },

    /// Malformed request errors.
    #[error("Request error: {kind}")]
    Request { kind: RequestErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a credential was rejected.
///
/// These are for server-side logs only. Clients always see the same
/// `403 Forbidden` regardless of the kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    #[error("Malformed timestamp")]
    MalformedTimestamp,

    #[error("Request expired: age {age_seconds}s exceeds maximum")]
    RequestExpired { age_seconds: i64 },

    #[error("Request timestamp is {ahead_seconds}s in the future")]
    RequestFromFuture { ahead_seconds: i64 },

    #[error("Timestamp already used (replay attack detected)")]
    TimestampReused,

    #[error("Invalid digest")]
    InvalidDigest,

    #[error("Failed to read shared secret: {message}")]
    SecretError { message: String },
}

/// Clipboard backend error kinds.
#[derive(Error, Debug)]
pub enum ClipboardErrorKind {
    #[error("Clipboard unavailable: {message}")]
    Unavailable { message: String },

    #[error("Clipboard command failed: {message}")]
    CommandFailed { message: String },

    #[error("Clipboard command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Clipboard content is not valid UTF-8")]
    InvalidUtf8,

    #[error("Clipboard task failed: {message}")]
    TaskFailed { message: String },
}

/// Malformed request error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestErrorKind {
    #[error("Empty payload")]
    EmptyPayload,

    #[error("Invalid JSON payload: {message}")]
    InvalidJson { message: String },

    #[error("Payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("Failed to read request body: {message}")]
    BodyUnreadable { message: String },

    #[error("Unsupported method: {method}")]
    UnsupportedMethod { method: String },
}

/// Result type alias for clipd operations.
pub type ClipResult<T> = Result<T, ClipError>;
