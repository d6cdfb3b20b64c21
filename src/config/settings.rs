//! Configuration settings for clipd.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::DigestScheme;
use crate::error::ClipError;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on, e.g. "0.0.0.0:8777".
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Grace period for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret given inline.
    #[serde(default)]
    pub shared_secret: Option<String>,
    /// Path to a file holding the shared secret.
    #[serde(default)]
    pub shared_secret_path: Option<PathBuf>,
    /// Digest scheme clients sign with.
    #[serde(default)]
    pub digest: DigestScheme,
    /// Maximum age of a request timestamp in seconds.
    #[serde(default = "default_freshness_window")]
    pub freshness_window_seconds: u64,
    /// Number of consumed timestamps remembered for replay detection.
    #[serde(default = "default_replay_capacity")]
    pub replay_capacity: usize,
}

/// Which clipboard implementation serves reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External utilities such as xclip.
    #[default]
    Command,
    /// Native clipboard access.
    System,
    /// In-process buffer.
    Memory,
}

/// Clipboard backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipboardConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Program and arguments printing the clipboard to stdout.
    #[serde(default = "default_read_command")]
    pub read_command: Vec<String>,
    /// Program and arguments taking new clipboard content on stdin.
    #[serde(default = "default_write_command")]
    pub write_command: Vec<String>,
    /// Timeout for a single clipboard command.
    #[serde(default = "default_clipboard_timeout")]
    pub timeout_seconds: u64,
}

/// Accepted body formats for clipboard writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// `{"data": "..."}` only.
    Json,
    /// Body text verbatim.
    Raw,
    /// `{"data": ...}` when declared as JSON or when the body is such an
    /// object, raw text otherwise.
    #[default]
    Auto,
}

/// Request handling configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub payload: PayloadFormat,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_listen_address() -> String {
    "0.0.0.0:8777".to_string()
}

fn default_shutdown_grace() -> u64 {
    3
}

fn default_max_body_bytes() -> usize {
    1_048_576 // 1MB
}

fn default_freshness_window() -> u64 {
    10
}

fn default_replay_capacity() -> usize {
    20
}

fn default_read_command() -> Vec<String> {
    ["xclip", "-selection", "clipboard", "-o"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_write_command() -> Vec<String> {
    ["xclip", "-selection", "clipboard"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_clipboard_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            shutdown_grace_seconds: default_shutdown_grace(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            shared_secret_path: None,
            digest: DigestScheme::default(),
            freshness_window_seconds: default_freshness_window(),
            replay_capacity: default_replay_capacity(),
        }
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            read_command: default_read_command(),
            write_command: default_write_command(),
            timeout_seconds: default_clipboard_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ClipError> {
        self.listen_address
            .parse()
            .map_err(|e| ClipError::Config {
                message: format!("Invalid listen address '{}': {}", self.listen_address, e),
            })
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClipError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ClipError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ClipError::Config { message } => ClipError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ClipError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ClipError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ClipError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ClipError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ClipError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        self.server.socket_addr()?;

        match (&self.security.shared_secret, &self.security.shared_secret_path) {
            (Some(_), Some(_)) => {
                return Err(ClipError::Config {
                    message: "Set either shared_secret or shared_secret_path, not both"
                        .to_string(),
                });
            }
            (None, None) => {
                return Err(ClipError::Config {
                    message: "No shared secret configured (shared_secret or shared_secret_path)"
                        .to_string(),
                });
            }
            (Some(secret), None) if secret.is_empty() => {
                return Err(ClipError::Config {
                    message: "shared_secret must not be empty".to_string(),
                });
            }
            _ => {}
        }

        if self.security.freshness_window_seconds == 0 {
            return Err(ClipError::Config {
                message: "freshness_window_seconds must be at least 1".to_string(),
            });
        }

        if self.security.replay_capacity == 0 {
            return Err(ClipError::Config {
                message: "replay_capacity must be at least 1".to_string(),
            });
        }

        if self.clipboard.backend == BackendKind::Command
            && (self.clipboard.read_command.is_empty() || self.clipboard.write_command.is_empty())
        {
            return Err(ClipError::Config {
                message: "read_command and write_command must name a program".to_string(),
            });
        }

        Ok(())
    }
}
