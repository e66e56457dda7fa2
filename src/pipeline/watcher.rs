//! Directory watcher forwarding JSON file modifications

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Watches one directory (non-recursive) and forwards modification events
/// for `.json` files.
///
/// Filtering happens before the channel: directory events and non-JSON paths
/// never reach the pipeline. Failing to attach to the directory is fatal and
/// reported at construction; there is no retry here.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<PathBuf>,
}

impl DirWatcher {
    pub fn new(dir: &Path) -> Result<Self> {
        anyhow::ensure!(
            dir.is_dir(),
            "watched directory does not exist: {}",
            dir.display()
        );

        let (tx, rx) = mpsc::channel(256);

        // The callback runs on notify's own OS thread, never in tokio
        // context; try_send is the hand-off across that boundary.
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_)) {
                        return;
                    }
                    for path in event.paths {
                        if path.is_dir()
                            || path.extension().and_then(|ext| ext.to_str()) != Some("json")
                        {
                            continue;
                        }
                        if tx.try_send(path).is_err() {
                            warn!("pipeline backlogged, dropping a change event");
                        }
                    }
                }
                Err(e) => error!("watch error: {}", e),
            }
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch directory: {}", dir.display()))?;

        info!("watching {} for JSON state files", dir.display());

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Next filtered change event.
    /// Returns None if the watcher backend has shut down.
    pub async fn next_event(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        assert!(DirWatcher::new(&gone).is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_json_modification_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensor.json");
        fs::write(&path, "{}").unwrap();

        let mut watcher = DirWatcher::new(dir.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&path, r#"{"temp": 21.5}"#).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), watcher.next_event())
            .await
            .expect("no event within timeout")
            .expect("watcher channel closed");
        assert_eq!(event.file_name().unwrap(), "sensor.json");
    }

    #[tokio::test]
    #[serial]
    async fn test_non_json_files_are_filtered() {
        let dir = TempDir::new().unwrap();
        let ignored = dir.path().join("notes.txt");
        fs::write(&ignored, "hello").unwrap();

        let mut watcher = DirWatcher::new(dir.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&ignored, "hello again").unwrap();

        let event = tokio::time::timeout(Duration::from_millis(500), watcher.next_event()).await;
        assert!(event.is_err(), "non-JSON file must not produce an event");
    }
}
