//! File system watcher for one document.
//!
//! Editors save in bursts (truncate, write, rename, chmod …). Raw `notify`
//! events for the target file are collapsed into one re-read per quiet
//! period, and the resulting text is forwarded.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchConfig {
    /// Quiet period before a burst of events is turned into one re-read
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// What the watched file did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// New contents after a burst of changes
    Changed(String),
    /// The file is gone (or unreadable)
    Removed,
}

/// Watches a single file; stops when dropped
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
    path: PathBuf,
}

impl FileWatcher {
    /// Start watching `path`, sending debounced events to `events`
    pub fn spawn(path: PathBuf, config: &WatchConfig, events: mpsc::Sender<WatchEvent>) -> WatcherResult<Self> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = path
            .file_name()
            .ok_or_else(|| WatcherError::WatchError(format!("not a file path: {}", path.display())))?
            .to_os_string();

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let target = file_name.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &target) => {
                    let _ = raw_tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Watch error"),
            },
            Config::default(),
        )?;

        // The directory, not the file: editors often replace the file
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(path = %path.display(), "Watching file");

        let task = tokio::spawn(debounce(path.clone(), config.debounce(), raw_rx, events));

        Ok(Self {
            _watcher: watcher,
            task,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn touches(event: &Event, file_name: &std::ffi::OsStr) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant && event.paths.iter().any(|p| p.file_name() == Some(file_name))
}

async fn debounce(
    path: PathBuf,
    window: Duration,
    mut raw: mpsc::UnboundedReceiver<()>,
    events: mpsc::Sender<WatchEvent>,
) {
    while raw.recv().await.is_some() {
        // Wait until the burst is over
        loop {
            match tokio::time::timeout(window, raw.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let event = match tokio::fs::read_to_string(&path).await {
            Ok(text) => WatchEvent::Changed(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Watched file unreadable");
                WatchEvent::Removed
            }
        };
        if events.send(event).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_burst_of_writes_is_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.py");
        fs::write(&path, "x = 0\n").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let config = WatchConfig { debounce_ms: 200 };
        let _watcher = FileWatcher::spawn(path.clone(), &config, tx).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        for i in 1..=5 {
            fs::write(&path, format!("x = {}\n", i)).unwrap();
        }

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, WatchEvent::Changed("x = 5\n".to_string()));

        // Nothing else queued after the burst settled
        let extra = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
        assert!(extra.is_err(), "unexpected extra event {:?}", extra);
    }

    #[tokio::test]
    async fn test_other_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.py");
        fs::write(&path, "x = 0\n").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let _watcher = FileWatcher::spawn(path, &WatchConfig::default(), tx).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        fs::write(dir.path().join("other.py"), "y = 1\n").unwrap();
        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(event.is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config: WatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(100));
    }
}
