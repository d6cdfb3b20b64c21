//! Timestamp-bound request authentication with replay protection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::SecurityConfig;
use crate::error::{AuthErrorKind, ClipError};

use super::{DigestScheme, Digester, ReplayHistory};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Validates `(timestamp, tag)` credentials.
///
/// A credential is accepted when its timestamp is within the freshness
/// window, has not been consumed before, and its tag matches the digest of
/// the timestamp under the shared secret. The timestamp is consumed before
/// the tag is checked, so a captured timestamp cannot be retried with a
/// different tag.
pub struct Authenticator {
    digester: Digester,
    history: Mutex<ReplayHistory>,
    max_age: Duration,
}

impl Authenticator {
    pub fn new(scheme: DigestScheme, secret: &[u8], max_age: Duration, capacity: usize) -> Self {
        Self {
            digester: Digester::new(scheme, secret),
            history: Mutex::new(ReplayHistory::new(capacity)),
            max_age,
        }
    }

    /// Build an authenticator from the security settings, loading the secret
    /// from disk if configured that way.
    pub fn from_settings(security: &SecurityConfig) -> Result<Self, ClipError> {
        let secret = match (&security.shared_secret, &security.shared_secret_path) {
            (Some(secret), _) => secret.clone(),
            (None, Some(path)) => Self::load_secret(path)?,
            (None, None) => {
                return Err(ClipError::Auth {
                    kind: AuthErrorKind::SecretError {
                        message: "No shared secret configured".to_string(),
                    },
                })
            }
        };

        if secret.is_empty() {
            return Err(ClipError::Auth {
                kind: AuthErrorKind::SecretError {
                    message: "Shared secret is empty".to_string(),
                },
            });
        }

        Ok(Self::new(
            security.digest,
            secret.as_bytes(),
            Duration::from_secs(security.freshness_window_seconds),
            security.replay_capacity,
        ))
    }

    /// Load the shared secret from a file.
    ///
    /// On unix the file must not be readable by group or others. Trailing
    /// line breaks are stripped.
    pub fn load_secret(path: &Path) -> Result<String, ClipError> {
        let metadata = std::fs::metadata(path).map_err(|e| ClipError::Auth {
            kind: AuthErrorKind::SecretError {
                message: format!(
                    "Failed to read secret metadata from {}: {}",
                    path.display(),
                    e
                ),
            },
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(ClipError::Auth {
                    kind: AuthErrorKind::SecretError {
                        message: format!(
                            "Secret file {} has insecure permissions {:04o}, expected 0600 or 0400",
                            path.display(),
                            mode & 0o777
                        ),
                    },
                });
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;

        let content = std::fs::read_to_string(path).map_err(|e| ClipError::Auth {
            kind: AuthErrorKind::SecretError {
                message: format!("Failed to read secret from {}: {}", path.display(), e),
            },
        })?;

        Ok(content.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    /// Header carrying the tag for the configured digest scheme.
    pub fn tag_header(&self) -> &'static str {
        self.digester.scheme().header_name()
    }

    /// Accept or reject a credential against the current wall clock.
    pub fn authenticate(&self, timestamp: &str, tag: &str) -> bool {
        self.validate(timestamp, tag).is_ok()
    }

    /// Like [`authenticate`](Self::authenticate) but reports why a credential
    /// was rejected. The reason is for logging only.
    pub fn validate(&self, timestamp: &str, tag: &str) -> Result<(), AuthErrorKind> {
        self.validate_at(timestamp, tag, SystemTime::now())
    }

    /// Validate a credential as if the current time were `now`.
    pub fn validate_at(
        &self,
        timestamp: &str,
        tag: &str,
        now: SystemTime,
    ) -> Result<(), AuthErrorKind> {
        // 1. Parse
        let seconds: i64 = timestamp
            .parse()
            .map_err(|_| AuthErrorKind::MalformedTimestamp)?;

        // 2. Freshness, symmetric around now
        let age_nanos = unix_nanos(now) - i128::from(seconds) * NANOS_PER_SEC;
        let window_nanos = self.max_age.as_nanos() as i128;
        if age_nanos > window_nanos {
            return Err(AuthErrorKind::RequestExpired {
                age_seconds: whole_seconds(age_nanos),
            });
        }
        if -age_nanos > window_nanos {
            return Err(AuthErrorKind::RequestFromFuture {
                ahead_seconds: whole_seconds(-age_nanos),
            });
        }

        // 3 + 4. Consume the timestamp under one lock. "0042" and "42" name
        // the same second, so the canonical rendering is what gets stored.
        let canonical = seconds.to_string();
        {
            let mut history = self.lock_history();
            if !history.check_and_record(&canonical) {
                return Err(AuthErrorKind::TimestampReused);
            }
            debug!(timestamp = %canonical, entries = history.len(), "Timestamp consumed");
        }

        // 5. Digest over the timestamp exactly as presented
        if !self.digester.verify(timestamp, tag) {
            return Err(AuthErrorKind::InvalidDigest);
        }

        Ok(())
    }

    /// Expected tag for `timestamp` (for clients and tests).
    pub fn sign(&self, timestamp: &str) -> String {
        self.digester.tag(timestamp)
    }

    /// Number of consumed timestamps currently remembered.
    pub fn history_len(&self) -> usize {
        self.lock_history().len()
    }

    /// Consumed timestamps from oldest to newest.
    pub fn history_snapshot(&self) -> Vec<String> {
        self.lock_history().entries().map(str::to_string).collect()
    }

    fn lock_history(&self) -> MutexGuard<'_, ReplayHistory> {
        // Recover from mutex poisoning; the history is always left consistent
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Signed nanoseconds since the unix epoch.
fn unix_nanos(t: SystemTime) -> i128 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i128,
        Err(e) => -(e.duration().as_nanos() as i128),
    }
}

fn whole_seconds(nanos: i128) -> i64 {
    i64::try_from(nanos / NANOS_PER_SEC).unwrap_or(i64::MAX)
}

/// Current unix time in whole seconds.
pub fn unix_now() -> i64 {
    whole_seconds(unix_nanos(SystemTime::now()))
}
