//! File watching for the files behind a loaded store.

use crate::core::ConfigStore;
use crate::error::{ConfigError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

/// Watches configuration files and signals when they change.
///
/// A store is loaded once, so the watcher does not reload anything: the
/// receiver gets one debounced `()` per burst of writes, and the caller decides
/// whether to build and load a fresh store.
///
/// # Examples
///
/// ```rust,no_run
/// use ordbok::notify::ConfigWatcher;
/// use ordbok::prelude::*;
/// use std::time::Duration;
///
/// # async fn example() -> Result<()> {
/// let config = ConfigStore::builder().load()?;
/// let (watcher, mut rx) = ConfigWatcher::new(Duration::from_millis(500))?;
/// watcher.watch_store(&config).await?;
///
/// while let Some(()) = rx.recv().await {
///     println!("configuration files changed");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ConfigWatcher {
    watcher: Arc<tokio::sync::Mutex<RecommendedWatcher>>,
    debounce_duration: Duration,
    watched_paths: Arc<tokio::sync::Mutex<Vec<PathBuf>>>,
}

impl ConfigWatcher {
    /// Create a new watcher and the receiver its change signals arrive on.
    ///
    /// Events closer together than `debounce_duration` collapse into one signal.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Watch`] if the platform watcher cannot be created.
    pub fn new(debounce_duration: Duration) -> Result<(Self, mpsc::Receiver<()>)> {
        let (tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event)
                    if matches!(
                        event.kind,
                        notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                    ) =>
                {
                    tracing::debug!(paths = ?event.paths, "configuration file event");
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "file watcher error"),
            }
        })
        .map_err(|e| ConfigError::Watch(format!("failed to create file watcher: {}", e)))?;

        tokio::spawn(debounce(event_rx, tx, debounce_duration));

        Ok((
            Self {
                watcher: Arc::new(tokio::sync::Mutex::new(watcher)),
                debounce_duration,
                watched_paths: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            },
            rx,
        ))
    }

    /// Watch a single file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the path does not exist, or
    /// [`ConfigError::Watch`] if it cannot be watched.
    pub async fn watch(&self, path: impl AsRef<Path>) -> Result<()> {
        let canonical_path = path.as_ref().canonicalize()?;

        let mut watcher = self.watcher.lock().await;
        watcher
            .watch(&canonical_path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watch(format!("failed to watch {}: {}", canonical_path.display(), e)))?;

        let mut paths = self.watched_paths.lock().await;
        if !paths.contains(&canonical_path) {
            tracing::debug!(path = %canonical_path.display(), "watching configuration file");
            paths.push(canonical_path);
        }

        Ok(())
    }

    /// Watch every source file of a loaded store that exists on disk.
    ///
    /// Returns how many files are now watched for this store.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`ConfigWatcher::watch`].
    pub async fn watch_store(&self, store: &ConfigStore) -> Result<usize> {
        let mut count = 0;
        for path in store.source_file_paths() {
            if !path.exists() {
                continue;
            }
            self.watch(&path).await?;
            count += 1;
        }
        tracing::info!(count, "watching configuration sources");
        Ok(count)
    }

    /// Stop watching a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the path does not exist, or
    /// [`ConfigError::Watch`] if it was not being watched.
    pub async fn unwatch(&self, path: impl AsRef<Path>) -> Result<()> {
        let canonical_path = path.as_ref().canonicalize()?;

        let mut watcher = self.watcher.lock().await;
        watcher
            .unwatch(&canonical_path)
            .map_err(|e| ConfigError::Watch(format!("failed to unwatch {}: {}", canonical_path.display(), e)))?;

        let mut paths = self.watched_paths.lock().await;
        paths.retain(|p| p != &canonical_path);

        Ok(())
    }

    /// Get the debounce duration for this watcher.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }

    /// Currently watched paths, canonicalized.
    pub async fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.lock().await.clone()
    }
}

/// Forward `events` to `tx`, at most one signal per `window`.
///
/// The first event after a quiet period signals at once. Events inside the
/// window of the last signal collapse into one trailing signal at the end of
/// that window. Trailing signals open a new window like any other.
async fn debounce(mut events: mpsc::UnboundedReceiver<()>, tx: mpsc::Sender<()>, window: Duration) {
    let mut last_signal: Option<Instant> = None;
    let mut trailing: Option<Instant> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                if event.is_none() {
                    break;
                }
                if trailing.is_some() {
                    continue;
                }
                let now = Instant::now();
                match last_signal {
                    Some(last) if now.duration_since(last) < window => {
                        trailing = Some(last + window);
                    }
                    _ => {
                        if tx.send(()).await.is_err() {
                            break;
                        }
                        last_signal = Some(now);
                    }
                }
            }
            _ = sleep_until(trailing.unwrap_or_else(Instant::now)), if trailing.is_some() => {
                trailing = None;
                if tx.send(()).await.is_err() {
                    break;
                }
                last_signal = Some(Instant::now());
            }
        }
    }
}
