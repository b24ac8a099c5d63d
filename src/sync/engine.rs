use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, Mutex};

/// A filesystem change relevant to the pairing orchestrator's bidirectional
/// sync: just enough to decide "re-run the sync pass", not a full diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub path: PathBuf,
    pub kind: SyncEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEventKind {
    Created,
    Modified,
    Removed,
    Other,
}

impl From<&EventKind> for SyncEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => SyncEventKind::Created,
            EventKind::Modify(_) => SyncEventKind::Modified,
            EventKind::Remove(_) => SyncEventKind::Removed,
            _ => SyncEventKind::Other,
        }
    }
}

/// File-watching backend for the pairing orchestrator. A trait so pairing
/// tests can drive synthetic events through [`FakeSyncEngine`] instead of
/// touching the real filesystem, the same adapter pattern
/// [`crate::vcs::VcsAdapter`] and [`crate::container::ContainerAdapter`] use.
#[async_trait]
pub trait SyncEngine: Send + Sync {
    async fn watch(&mut self, path: &Path) -> Result<(), String>;
    async fn unwatch(&mut self, path: &Path) -> Result<(), String>;
    /// Awaits the next coalesced change event. Returns `None` once the
    /// watcher has been shut down and no further events will arrive.
    async fn next_event(&mut self) -> Option<SyncEvent>;
}

/// Real implementation backed by `notify`'s recommended platform watcher.
/// The callback notify invokes from its own background thread forwards
/// onto a bounded tokio channel so the async pairing loop can await events
/// like any other source.
pub struct NotifySyncEngine {
    watcher: Option<RecommendedWatcher>,
    rx: mpsc::Receiver<SyncEvent>,
    tx: mpsc::Sender<SyncEvent>,
}

impl NotifySyncEngine {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            watcher: None,
            rx,
            tx,
        }
    }

    fn ensure_watcher(&mut self) -> Result<&mut RecommendedWatcher, String> {
        if self.watcher.is_none() {
            let tx = self.tx.clone();
            let handler = move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for path in event.paths.iter().cloned() {
                        let sync_event = SyncEvent {
                            path,
                            kind: SyncEventKind::from(&event.kind),
                        };
                        // try_send: a full channel means the pairing loop is
                        // behind already; drop rather than block notify's
                        // callback thread.
                        let _ = tx.try_send(sync_event);
                    }
                }
                Err(e) => log::warn!("file watch error: {e}"),
            };
            let watcher = RecommendedWatcher::new(handler, Config::default())
                .map_err(|e| format!("failed to create file watcher: {e}"))?;
            self.watcher = Some(watcher);
        }
        Ok(self.watcher.as_mut().unwrap())
    }
}

impl Default for NotifySyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncEngine for NotifySyncEngine {
    async fn watch(&mut self, path: &Path) -> Result<(), String> {
        let path = path.to_path_buf();
        let watcher = self.ensure_watcher()?;
        watcher
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|e| format!("failed to watch {}: {e}", path.display()))
    }

    async fn unwatch(&mut self, path: &Path) -> Result<(), String> {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher
                .unwatch(path)
                .map_err(|e| format!("failed to unwatch {}: {e}", path.display()))?;
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SyncEvent> {
        self.rx.recv().await
    }
}

/// In-memory fake for pairing tests: [`push_event`](FakeSyncEngine::push_event)
/// queues a synthetic event for `next_event` to return.
pub struct FakeSyncEngine {
    watched: Mutex<Vec<PathBuf>>,
    queue: mpsc::UnboundedReceiver<SyncEvent>,
    queue_tx: mpsc::UnboundedSender<SyncEvent>,
}

impl FakeSyncEngine {
    pub fn new() -> Self {
        let (queue_tx, queue) = mpsc::unbounded_channel();
        Self {
            watched: Mutex::new(Vec::new()),
            queue,
            queue_tx,
        }
    }

    pub fn push_event(&self, event: SyncEvent) {
        let _ = self.queue_tx.send(event);
    }
}

impl Default for FakeSyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncEngine for FakeSyncEngine {
    async fn watch(&mut self, path: &Path) -> Result<(), String> {
        self.watched.lock().await.push(path.to_path_buf());
        Ok(())
    }

    async fn unwatch(&mut self, path: &Path) -> Result<(), String> {
        self.watched.lock().await.retain(|p| p != path);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SyncEvent> {
        self.queue.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_engine_returns_pushed_events_in_order() {
        let mut engine = FakeSyncEngine::new();
        engine.push_event(SyncEvent {
            path: PathBuf::from("/tmp/a"),
            kind: SyncEventKind::Modified,
        });
        let event = engine.next_event().await.unwrap();
        assert_eq!(event.path, PathBuf::from("/tmp/a"));
        assert_eq!(event.kind, SyncEventKind::Modified);
    }

    #[tokio::test]
    async fn fake_engine_tracks_watched_paths() {
        let mut engine = FakeSyncEngine::new();
        engine.watch(Path::new("/tmp/repo")).await.unwrap();
        assert_eq!(engine.watched.lock().await.len(), 1);
        engine.unwatch(Path::new("/tmp/repo")).await.unwrap();
        assert_eq!(engine.watched.lock().await.len(), 0);
    }
}
