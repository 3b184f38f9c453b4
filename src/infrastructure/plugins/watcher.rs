//! Plugin directory watcher
//!
//! Filesystem events land in a single-slot queue. While a reload is pending
//! further events are dropped, so a burst of writes costs one reload. Reloads
//! run on one task and never overlap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::loader::{PluginLoader, PluginSource};
use crate::application::errors::BotError;

/// Keeps the OS watcher and the reload task alive
pub struct PluginWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl PluginWatcher {
    /// Watch the loader's source directory and reload on changes
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(loader: PluginLoader, debounce: Duration) -> Result<Self, BotError> {
        let root = loader
            .source()
            .watch_root()
            .map(Path::to_path_buf)
            .ok_or_else(|| BotError::Internal("plugin source has no directory to watch".to_string()))?;

        let (tx, rx) = mpsc::channel::<PathBuf>(1);
        let source = Arc::clone(loader.source());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if let Some(path) = relevant_path(source.as_ref(), &event) {
                    // a full queue means a reload is already pending
                    let _ = tx.try_send(path);
                }
            }
            Err(e) => error!("Plugin watcher error: {}", e),
        })?;

        watcher.watch(&root, RecursiveMode::NonRecursive)?;
        info!("Watching plugin directory: {}", root.display());

        let task = tokio::spawn(reload_loop(loader, rx, debounce));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Stop watching; an in-flight reload is abandoned
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Path that should trigger a reload, if the event touches a plugin unit
pub fn relevant_path(source: &dyn PluginSource, event: &Event) -> Option<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        _ => {
            debug!("Ignoring event kind: {:?}", event.kind);
            return None;
        }
    }

    event.paths.iter().find(|p| source.is_candidate(p)).cloned()
}

async fn reload_loop(loader: PluginLoader, mut rx: mpsc::Receiver<PathBuf>, debounce: Duration) {
    while let Some(path) = rx.recv().await {
        tokio::time::sleep(debounce).await;
        while rx.try_recv().is_ok() {}

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        info!("Reloading commands due to change in: {}", name);

        match loader.reload().await {
            Ok(report) if !report.is_clean() => {
                warn!("Reload finished with {} failed plugin(s)", report.failures.len());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to reload commands: {}", e),
        }
    }

    info!("Plugin watcher loop ended");
}
