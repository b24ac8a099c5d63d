use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::sync::SyncEngine;
use crate::vcs::{GitError, VcsAdapter};

/// Lifecycle state of a pairing session: mirror-editing a workstream's
/// branch into the main working tree so an editor opened against the repo
/// root sees the agent's in-progress changes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    Inactive,
    Enabling,
    Active,
    Disabling,
}

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("pairing is already active")]
    AlreadyActive,
    #[error("pairing is not active")]
    NotActive,
    #[error("git operation failed while enabling pairing: {0}")]
    Enable(#[source] GitError),
    #[error("git operation failed while disabling pairing: {0}")]
    Disable(#[source] GitError),
}

/// Uncommitted-change counts surfaced by a periodic health check. Informational
/// only — callers decide what, if anything, to show the user; the check
/// itself never mutates repo state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairingHealth {
    pub modified: usize,
    pub untracked: usize,
    /// File events observed by the sync engine since pairing began —
    /// surfaced to the user as toasts, never acted on here.
    pub sync_events: usize,
}

/// The background task draining the sync engine and a counter it updates;
/// dropping this drops the engine (and with it, `notify`'s watcher), which
/// is sufficient cleanup for `disable` — there is no need to explicitly
/// unwatch a path whose watcher is about to be destroyed.
struct SyncHandle {
    task: JoinHandle<()>,
    event_count: Arc<AtomicUsize>,
}

/// Orchestrates a single pairing session between the repo's main working
/// tree and one workstream's branch. Only one workstream may be paired at a
/// time — [`crate::workstream::WorkstreamManager`] enforces that at the
/// model level; this type enforces the enable/disable sequencing.
///
/// Enable stashes whatever the main tree currently has uncommitted, checks
/// out the paired branch, and remembers whether a stash actually happened.
/// Disable reverses it: stash the paired branch's changes (if any), check
/// back out to the original branch, and restore the original stash. Any
/// failure mid-sequence unwinds back to `Inactive` rather than leaving the
/// tree on an unexpected branch.
pub struct Pairing {
    state: PairingState,
    original_branch: Option<String>,
    stashed_on_enable: bool,
    sync: Option<SyncHandle>,
}

impl Default for Pairing {
    fn default() -> Self {
        Self::new()
    }
}

impl Pairing {
    pub fn new() -> Self {
        Self {
            state: PairingState::Inactive,
            original_branch: None,
            stashed_on_enable: false,
            sync: None,
        }
    }

    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Enables pairing: stashes the host tree, checks out `branch`, then
    /// starts watching `host_path` and `container_path` (the container's
    /// mounted project path) for bidirectional-sync-relevant changes via
    /// `sync_engine` — step 3 of the enable sequence (§4.7).
    pub async fn enable(
        &mut self,
        vcs: &dyn VcsAdapter,
        branch: &str,
        mut sync_engine: Box<dyn SyncEngine>,
        host_path: PathBuf,
        container_path: PathBuf,
    ) -> Result<(), PairingError> {
        if self.state != PairingState::Inactive {
            return Err(PairingError::AlreadyActive);
        }
        self.state = PairingState::Enabling;

        let original = match vcs.current_branch().await {
            Ok(b) => b,
            Err(e) => {
                self.state = PairingState::Inactive;
                return Err(PairingError::Enable(e));
            }
        };

        let stashed = match vcs.stash("ringleader: pairing enable").await {
            Ok(stashed) => stashed,
            Err(e) => {
                self.state = PairingState::Inactive;
                return Err(PairingError::Enable(e));
            }
        };

        if let Err(e) = vcs.checkout_branch(branch).await {
            // Unwind: restore the stash we just took before giving up.
            if stashed {
                let _ = vcs.stash_pop().await;
            }
            self.state = PairingState::Inactive;
            return Err(PairingError::Enable(e));
        }

        if let Err(message) = sync_engine.watch(&host_path).await {
            if stashed {
                let _ = vcs.stash_pop().await;
            }
            let _ = vcs.checkout_branch(&original).await;
            self.state = PairingState::Inactive;
            return Err(PairingError::Enable(GitError::CommandFailed {
                code: -1,
                stderr: message,
                command: "sync watch (host)".to_string(),
            }));
        }
        let _ = sync_engine.watch(&container_path).await;

        let event_count = Arc::new(AtomicUsize::new(0));
        let counter = event_count.clone();
        let task = tokio::spawn(async move {
            let mut engine = sync_engine;
            while engine.next_event().await.is_some() {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        self.sync = Some(SyncHandle { task, event_count });

        self.original_branch = Some(original);
        self.stashed_on_enable = stashed;
        self.state = PairingState::Active;
        Ok(())
    }

    /// Disables pairing: stashes whatever pairing left uncommitted on the
    /// paired branch, checks back out to the original branch, and stops.
    /// Deliberately does *not* pop the stash taken in [`Self::enable`] — by
    /// this point a second stash may sit on top of it, so popping here could
    /// restore the wrong one. Instead this returns whether a stash is
    /// pending (either the enable-time stash or the one just taken), so the
    /// caller can surface a hint telling the user to `git stash pop`
    /// themselves.
    pub async fn disable(&mut self, vcs: &dyn VcsAdapter) -> Result<bool, PairingError> {
        if self.state != PairingState::Active {
            return Err(PairingError::NotActive);
        }
        self.state = PairingState::Disabling;

        let original = self
            .original_branch
            .clone()
            .expect("original_branch is set whenever state is Active");

        // Stash whatever pairing left uncommitted on the paired branch so
        // checking back out doesn't clobber it.
        let paired_stashed = match vcs.stash("ringleader: pairing disable").await {
            Ok(stashed) => stashed,
            Err(e) => {
                self.state = PairingState::Active;
                return Err(PairingError::Disable(e));
            }
        };

        if let Err(e) = vcs.checkout_branch(&original).await {
            if paired_stashed {
                let _ = vcs.stash_pop().await;
            }
            self.state = PairingState::Active;
            return Err(PairingError::Disable(e));
        }

        let stash_pending = self.stashed_on_enable || paired_stashed;
        self.original_branch = None;
        self.stashed_on_enable = false;
        self.state = PairingState::Inactive;
        self.stop_sync();
        Ok(stash_pending)
    }

    /// Stops the background sync-event drain task and drops the sync
    /// engine, tearing down its watches.
    fn stop_sync(&mut self) {
        if let Some(handle) = self.sync.take() {
            handle.task.abort();
        }
    }

    /// Reports uncommitted-change counts on the currently paired branch and
    /// file events seen by the sync engine since pairing began. Callers
    /// poll this on a fixed interval; it performs no writes and never
    /// changes `state`.
    pub async fn health_check(&self, vcs: &dyn VcsAdapter) -> Result<PairingHealth, GitError> {
        let status = vcs.status().await?;
        let sync_events = self
            .sync
            .as_ref()
            .map(|h| h.event_count.load(Ordering::Relaxed))
            .unwrap_or(0);
        Ok(PairingHealth {
            modified: status.modified.len(),
            untracked: status.untracked.len(),
            sync_events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::FakeSyncEngine;
    use crate::vcs::FakeVcs;

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("/host/repo"), PathBuf::from("/container/repo"))
    }

    #[tokio::test]
    async fn enable_then_disable_returns_to_original_branch() {
        let vcs = FakeVcs::new("main");
        vcs.create_branch("feature-a", None).await.unwrap();
        let mut pairing = Pairing::new();
        let (host, container) = paths();

        pairing
            .enable(&vcs, "feature-a", Box::new(FakeSyncEngine::new()), host, container)
            .await
            .unwrap();
        assert_eq!(pairing.state(), PairingState::Active);
        assert_eq!(vcs.current_branch().await.unwrap(), "feature-a");

        let stash_pending = pairing.disable(&vcs).await.unwrap();
        assert_eq!(pairing.state(), PairingState::Inactive);
        assert_eq!(vcs.current_branch().await.unwrap(), "main");
        assert!(stash_pending, "FakeVcs.stash() always reports a stash was taken");
    }

    #[tokio::test]
    async fn disable_does_not_auto_pop_the_stash() {
        let vcs = FakeVcs::new("main");
        vcs.create_branch("feature-a", None).await.unwrap();
        let mut pairing = Pairing::new();
        let (host, container) = paths();
        pairing
            .enable(&vcs, "feature-a", Box::new(FakeSyncEngine::new()), host, container)
            .await
            .unwrap();
        let depth_before = *vcs.stash_depth.lock().unwrap();
        assert!(depth_before > 0, "enable should have stashed");

        pairing.disable(&vcs).await.unwrap();
        let depth_after = *vcs.stash_depth.lock().unwrap();
        assert!(
            depth_after >= depth_before,
            "disable must not pop any stash entries on success"
        );
    }

    #[tokio::test]
    async fn enabling_twice_is_rejected() {
        let vcs = FakeVcs::new("main");
        vcs.create_branch("feature-a", None).await.unwrap();
        let mut pairing = Pairing::new();
        let (host, container) = paths();
        pairing
            .enable(&vcs, "feature-a", Box::new(FakeSyncEngine::new()), host.clone(), container.clone())
            .await
            .unwrap();

        let err = pairing
            .enable(&vcs, "feature-a", Box::new(FakeSyncEngine::new()), host, container)
            .await
            .unwrap_err();
        assert!(matches!(err, PairingError::AlreadyActive));
    }

    #[tokio::test]
    async fn disable_without_enable_is_rejected() {
        let vcs = FakeVcs::new("main");
        let mut pairing = Pairing::new();
        let err = pairing.disable(&vcs).await.unwrap_err();
        assert!(matches!(err, PairingError::NotActive));
    }

    #[tokio::test]
    async fn health_check_reports_counts_without_mutating_state() {
        let vcs = FakeVcs::new("main");
        vcs.create_branch("feature-a", None).await.unwrap();
        let mut pairing = Pairing::new();
        let (host, container) = paths();
        pairing
            .enable(&vcs, "feature-a", Box::new(FakeSyncEngine::new()), host, container)
            .await
            .unwrap();

        let health = pairing.health_check(&vcs).await.unwrap();
        assert_eq!(health, PairingHealth::default());
        assert_eq!(pairing.state(), PairingState::Active);
    }
}
