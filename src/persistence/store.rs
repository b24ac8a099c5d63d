use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::agent;
use crate::container::ContainerAdapter;
use crate::workstream::AppState;

/// Errors from loading or saving application state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads and writes a repo's [`AppState`] under the XDG data directory,
/// keyed by the same repo fingerprint [`crate::vcs::worktree::repo_hash`]
/// uses for worktree paths, so state and worktrees land side by side per
/// repository.
///
/// Writes are atomic: the new document is written to a sibling temp file,
/// fsynced, then renamed over the target, so a crash mid-write never leaves
/// a half-written document behind.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(state_dir: PathBuf, repo_fingerprint: &str) -> Self {
        Self {
            path: state_dir.join(format!("{repo_fingerprint}.json")),
        }
    }

    /// Resolves the standard state directory via `directories::ProjectDirs`,
    /// falling back to `$HOME/.local/share/ringleader` exactly as
    /// [`crate::vcs::worktree`] does, so the two never disagree about where
    /// a user's data lives.
    pub fn state_dir() -> PathBuf {
        directories::ProjectDirs::from("com", "ringleader", "ringleader")
            .map(|p| p.data_dir().join("state"))
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .map(|p| p.join(".local").join("share").join("ringleader").join("state"))
                    .expect("HOME environment variable must be set for state persistence")
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads previously persisted state, if any. A missing file is not an
    /// error — it means this is the first run for this repo. A schema
    /// version older than [`AppState::CURRENT_SCHEMA_VERSION`] is accepted
    /// as-is; migrations (if any become necessary) happen here, keyed on
    /// `schema_version`, not by rejecting the load.
    pub async fn load(&self) -> Result<Option<AppState>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let state: AppState = serde_json::from_slice(&bytes).map_err(|source| PersistError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Writes `state` to a temp file in the same directory, fsyncs it, then
    /// renames it over the real path. The rename is atomic on the same
    /// filesystem, so readers never observe a partially-written document.
    pub async fn save(&self, state: &AppState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| PersistError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(|source| PersistError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        use tokio::io::AsyncWriteExt;
        file.write_all(&json).await.map_err(|source| PersistError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        file.sync_all().await.map_err(|source| PersistError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|source| PersistError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Removes the state file entirely. Called on clean shutdown when no
    /// workstreams remain — there is nothing worth resuming next launch. A
    /// missing file is not an error; deletion is inherently idempotent.
    pub async fn delete(&self) -> Result<(), PersistError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Reconciles `state`'s workstreams against the container engine's own
    /// record of what's actually running, clearing any `container_id` that
    /// no longer appears in `adapter.list()`. Run once at startup and once
    /// before the final shutdown save, so a container removed out-of-band
    /// (e.g. `docker rm` by hand) doesn't leave a dangling reference that
    /// later commands would fail against.
    ///
    /// Also recovers `agent_session_id` for any still-live workstream whose
    /// copy was never persisted (e.g. the process was killed before the
    /// Quit sequence's session-file copy ran) by reading it back out of the
    /// container's own filesystem via `session_files_path`.
    pub async fn repair(state: &mut AppState, adapter: &dyn ContainerAdapter, session_files_path: &str) {
        let live = match adapter.list().await {
            Ok(summaries) => summaries,
            Err(e) => {
                log::warn!("skipping container repair pass: {e}");
                return;
            }
        };
        let live_ids: std::collections::HashSet<_> = live.into_iter().map(|s| s.id).collect();
        for ws in state.workstreams.iter_mut() {
            let Some(id) = ws.container_id.clone() else { continue };
            if !live_ids.contains(&id) {
                log::warn!(
                    "workstream {} referenced container {} which no longer exists; clearing",
                    ws.id,
                    id
                );
                ws.container_id = None;
                continue;
            }
            if ws.agent_session_id.is_empty() {
                if let Some(session_id) = agent::extract_session_id(adapter, &id, session_files_path).await {
                    log::info!("recovered agent session id for workstream {} from container filesystem", ws.id);
                    ws.agent_session_id = session_id;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::FakeContainer;
    use crate::workstream::{AppState, Workstream};

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf(), "abc123");
        let mut state = AppState::new("abc123");
        state.workstreams.push(Workstream::new(1, "feature-a", 0));

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.workstreams.len(), 1);
        assert_eq!(loaded.workstreams[0].branch, "feature-a");
    }

    #[tokio::test]
    async fn delete_removes_the_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf(), "abc123");
        let state = AppState::new("abc123");
        store.save(&state).await.unwrap();
        assert!(store.path().exists());
        store.delete().await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn delete_on_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf(), "nope");
        assert!(store.delete().await.is_ok());
    }

    #[tokio::test]
    async fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().to_path_buf(), "nope");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repair_clears_container_ids_not_in_live_list() {
        let fake = FakeContainer::new();
        let mut state = AppState::new("abc");
        let mut ws = Workstream::new(1, "feature-a", 0);
        ws.container_id = Some("ghost-container".to_string());
        state.workstreams.push(ws);

        Store::repair(&mut state, &fake, "/root/.claude").await;
        assert_eq!(state.workstreams[0].container_id, None);
    }
}
