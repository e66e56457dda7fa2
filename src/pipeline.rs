//! Ingestion pipeline: change events → debounce → decode → classify → store
//!
//! One tokio task owns the whole chain. It may sleep briefly inside decode
//! retries; readers are never affected because the store lock is only taken
//! for the final replace. Processing events to completion in arrival order
//! is also what keeps per-file updates last-write-wins.

pub mod debounce;
pub mod decode;
pub mod watcher;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::state::{classify, StateRecord, StateStore, UpdateNotice};
use debounce::DebounceGate;
use decode::{DecodeError, ResilientDecoder};
use watcher::DirWatcher;

/// Drives filesystem change events into the [`StateStore`].
pub struct UpdatePipeline {
    gate: DebounceGate,
    decoder: ResilientDecoder,
    store: StateStore,
    updates: broadcast::Sender<UpdateNotice>,
}

impl UpdatePipeline {
    pub fn new(
        config: &WatchConfig,
        store: StateStore,
        updates: broadcast::Sender<UpdateNotice>,
    ) -> Self {
        Self {
            gate: DebounceGate::new(config.debounce_window()),
            decoder: ResilientDecoder::new(config.max_decode_attempts, config.retry_delay()),
            store,
            updates,
        }
    }

    /// Run until `shutdown` resolves or the watcher goes away.
    ///
    /// An event being processed when shutdown fires is finished first; only
    /// then does the loop observe the signal and stop accepting new ones.
    pub async fn run(mut self, mut watcher: DirWatcher, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = watcher.next_event() => {
                    match event {
                        Some(path) => self.process_event(path).await,
                        None => {
                            warn!("watcher channel closed, stopping pipeline");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping ingestion");
                    break;
                }
            }
        }
    }

    /// Handle one change event start to finish.
    ///
    /// Every failure is contained here: the store keeps whatever it had and
    /// readers simply continue to see the last good state for that file.
    pub async fn process_event(&mut self, path: PathBuf) {
        if !self.gate.admit(&path, Instant::now()) {
            debug!("debounced duplicate event for {}", path.display());
            return;
        }

        match self.decoder.decode(&path).await {
            Ok(payload) => self.apply(&path, payload),
            Err(e @ DecodeError::NotFound { .. }) => debug!("{}", e),
            Err(e @ DecodeError::Malformed { .. }) => warn!("keeping previous state: {}", e),
            Err(e @ DecodeError::Io { .. }) => error!("keeping previous state: {}", e),
        }
    }

    fn apply(&self, path: &Path, payload: serde_json::Value) {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let tag = classify(&filename);

        info!("{} updated, state {}", filename, tag);

        self.store.update(StateRecord {
            filename: filename.clone(),
            tag,
            payload: payload.clone(),
            observed_at: Utc::now(),
        });

        // Best-effort: with no push listeners connected this is a no-op.
        let _ = self.updates.send(UpdateNotice {
            filename,
            state: tag,
            data: payload,
        });
    }
}
