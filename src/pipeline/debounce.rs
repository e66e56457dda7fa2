//! Per-file debounce of filesystem change notifications
//!
//! Watcher backends commonly fire several events for one logical write
//! (metadata touch plus content write); without this gate the same file
//! would be decoded multiple times per update.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Suppresses repeated events for the same path inside a fixed window.
///
/// Owned exclusively by the pipeline task, so no locking.
pub struct DebounceGate {
    window: Duration,
    last_accepted: HashMap<PathBuf, Instant>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Whether an event for `path` at `now` should pass.
    ///
    /// Accepts (and records `now`) on the first event for a path, or once at
    /// least the window has elapsed since the last *accepted* event.
    /// Rejection leaves the stored timestamp untouched.
    pub fn admit(&mut self, path: &Path, now: Instant) -> bool {
        match self.last_accepted.get(path) {
            Some(last) if now.duration_since(*last) < self.window => false,
            _ => {
                self.last_accepted.insert(path.to_path_buf(), now);
                true
            }
        }
    }
}
