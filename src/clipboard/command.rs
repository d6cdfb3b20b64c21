//! Clipboard access through external utilities such as xclip.

use std::time::Duration;

use tracing::warn;

use crate::error::{ClipError, ClipboardErrorKind};
use crate::executor::{summarize_output, SubprocessBuilder, SubprocessResult};

use super::ClipboardBackend;

/// Clipboard backed by a pair of commands.
///
/// The read command prints the clipboard to stdout. The write command takes
/// the new content on stdin; its output is discarded.
pub struct CommandClipboard {
    read_command: Vec<String>,
    write_command: Vec<String>,
    timeout: Duration,
}

impl CommandClipboard {
    pub fn new(read_command: Vec<String>, write_command: Vec<String>, timeout: Duration) -> Self {
        Self {
            read_command,
            write_command,
            timeout,
        }
    }

    fn check_status(result: &SubprocessResult, argv: &[String]) -> Result<(), ClipError> {
        if result.success {
            return Ok(());
        }

        let program = argv.first().map(String::as_str).unwrap_or_default();
        let stderr = summarize_output(&result.stderr, 5);
        warn!(
            program = %program,
            exit_code = ?result.exit_code,
            stderr = %stderr,
            "Clipboard command failed"
        );
        Err(ClipError::Clipboard {
            kind: ClipboardErrorKind::CommandFailed {
                message: format!("{} exited with {:?}", program, result.exit_code),
            },
        })
    }
}

impl ClipboardBackend for CommandClipboard {
    fn name(&self) -> &'static str {
        "command"
    }

    fn read(&self) -> Result<String, ClipError> {
        let result = SubprocessBuilder::from_argv(&self.read_command)?
            .timeout(self.timeout)
            .run()?;
        Self::check_status(&result, &self.read_command)?;

        String::from_utf8(result.stdout).map_err(|_| ClipError::Clipboard {
            kind: ClipboardErrorKind::InvalidUtf8,
        })
    }

    fn write(&self, text: &str) -> Result<(), ClipError> {
        let result = SubprocessBuilder::from_argv(&self.write_command)?
            .stdin(text)
            .discard_output()
            .sensitive()
            .timeout(self.timeout)
            .run()?;
        Self::check_status(&result, &self.write_command)
    }
}
