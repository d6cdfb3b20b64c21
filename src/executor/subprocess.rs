//! Subprocess execution for clipboard utilities.
//!
//! Runs external commands without a shell, optionally feeding stdin,
//! capturing stdout/stderr, and killing the process on timeout.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ClipError, ClipboardErrorKind};

/// How long pipe threads may keep draining once the child has exited.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Raw stdout bytes. Empty when output was not captured.
    pub stdout: Vec<u8>,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
    capture_output: bool,
    timeout: Duration,
    /// If true, stdin content is not logged
    sensitive: bool,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdin: None,
            capture_output: true,
            timeout: Duration::from_secs(5),
            sensitive: false,
        }
    }

    /// Build from a `[program, args...]` vector.
    pub fn from_argv(argv: &[String]) -> Result<Self, ClipError> {
        let (program, args) = argv.split_first().ok_or_else(|| ClipError::Clipboard {
            kind: ClipboardErrorKind::CommandFailed {
                message: "Empty command line".to_string(),
            },
        })?;
        Ok(Self::new(program).args(args))
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Bytes written to the child's stdin, which is then closed.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Discard stdout and stderr instead of capturing them.
    ///
    /// Needed for utilities such as xclip that fork a background process
    /// holding the clipboard: a captured pipe would stay open until that
    /// process exits.
    pub fn discard_output(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Set the timeout for the command.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mark the stdin content as sensitive so it is never logged.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Execute the command and wait for completion with timeout enforcement.
    ///
    /// If the process exceeds the configured timeout, it is killed and a
    /// timeout error is returned.
    pub fn run(self) -> Result<SubprocessResult, ClipError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            stdin_bytes = self.stdin.as_ref().map(Vec::len),
            sensitive = self.sensitive,
            timeout_secs = self.timeout.as_secs(),
            "Executing subprocess"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| ClipError::Clipboard {
            kind: ClipboardErrorKind::CommandFailed {
                message: format!("Failed to spawn {}: {}", self.program, e),
            },
        })?;

        // Feed stdin and drain pipes on helper threads so a chatty or slow
        // child cannot block on a full pipe while we poll for exit
        let writer = self.stdin.and_then(|input| {
            child.stdin.take().map(|mut pipe| {
                thread::spawn(move || {
                    // Broken pipe just means the child stopped reading
                    let _ = pipe.write_all(&input);
                })
            })
        });
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let status = wait_with_timeout(&mut child, self.timeout, &self.program);

        // Collect the pipe threads on the timeout path too. A descendant that
        // inherited a pipe keeps it open past the child's exit, so each join
        // is bounded and a thread still blocked after that is detached.
        let deadline = Instant::now() + PIPE_DRAIN_TIMEOUT;
        if let Some(handle) = writer {
            let _ = join_within(handle, deadline, "stdin");
        }
        let stdout = stdout_reader
            .and_then(|h| join_within(h, deadline, "stdout"))
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| join_within(h, deadline, "stderr"))
            .unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        let status = status?;

        let result = SubprocessResult {
            success: status.success(),
            exit_code: status.code(),
            stdout,
            stderr,
        };
        debug!(
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            "Subprocess completed"
        );
        Ok(result)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Join `handle` if it finishes before `deadline`, otherwise detach it.
fn join_within<T>(handle: JoinHandle<T>, deadline: Instant, pipe: &str) -> Option<T> {
    loop {
        if handle.is_finished() {
            return handle.join().ok();
        }
        if Instant::now() >= deadline {
            warn!(pipe = %pipe, "Pipe still held open after process exit, detaching");
            return None;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    program: &str,
) -> Result<std::process::ExitStatus, ClipError> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(10);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    warn!(
                        program = %program,
                        timeout_secs = timeout.as_secs(),
                        "Process timed out, killing"
                    );
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "Failed to kill timed-out process");
                    }
                    // Reap the zombie process
                    let _ = child.wait();
                    return Err(ClipError::Clipboard {
                        kind: ClipboardErrorKind::Timeout {
                            timeout_secs: timeout.as_secs(),
                        },
                    });
                }
                thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(ClipError::Clipboard {
                    kind: ClipboardErrorKind::CommandFailed {
                        message: format!("Failed to check process status: {}", e),
                    },
                });
            }
        }
    }
}

/// Shorten command output for inclusion in error messages.
pub fn summarize_output(output: &str, max_lines: usize) -> String {
    const MAX_LINE_CHARS: usize = 200;

    let mut lines: Vec<String> = output
        .lines()
        .take(max_lines)
        .map(|line| {
            if line.chars().count() > MAX_LINE_CHARS {
                let head: String = line.chars().take(MAX_LINE_CHARS).collect();
                format!("{}...", head)
            } else {
                line.to_string()
            }
        })
        .collect();

    if output.lines().count() > max_lines {
        lines.push("...[additional output truncated]".to_string());
    }

    lines.join("\n")
}
