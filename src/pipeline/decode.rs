//! Resilient JSON decoding with bounded retry

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a change event produced no usable payload.
///
/// Only [`Malformed`] is preceded by retries; the read errors are terminal
/// on first sight. Callers drop the event and keep whatever state they had.
///
/// [`Malformed`]: DecodeError::Malformed
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file vanished between the change event and the read, typically a
    /// removal or a mid-write replace. Retrying cannot help; the next write
    /// produces a fresh event.
    #[error("file disappeared before it could be read: {path}")]
    NotFound { path: PathBuf },

    /// Any read failure other than the file being gone.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file never parsed as JSON, even after re-reading.
    #[error("malformed JSON in {path} after {attempts} attempt(s): {source}")]
    Malformed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and parses one file as JSON, re-reading on parse failure.
///
/// A change event can race with a producer still writing the file, so a
/// truncated document usually becomes parseable a moment later. Total worst
/// case is bounded by `max_attempts * retry_delay`.
pub struct ResilientDecoder {
    max_attempts: u32,
    retry_delay: Duration,
}

impl ResilientDecoder {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Read the full contents of `path` and parse them as a JSON value.
    ///
    /// Each attempt re-reads the file, so a rewrite between attempts is
    /// picked up. Invalid UTF-8 counts as a parse failure.
    pub async fn decode(&self, path: &Path) -> Result<serde_json::Value, DecodeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let bytes = match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(DecodeError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) => {
                    return Err(DecodeError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            };

            match serde_json::from_slice(&bytes) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    debug!(
                        "parse attempt {}/{} failed for {}: {}",
                        attempt,
                        self.max_attempts,
                        path.display(),
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(DecodeError::Malformed {
                        path: path.to_path_buf(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
