use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::agent;
use crate::app::Command;
use crate::container::{ContainerAdapter, ContainerError};
use crate::github::{CreatePullRequestOptions, GitHub, GitHubError};
use crate::pairing::{Pairing, PairingError};
use crate::persistence::{PersistError, Store};
use crate::sync::NotifySyncEngine;
use crate::vcs::{GitError, VcsAdapter};
use crate::workstream::AppState;

/// Path inside the agent container where the project is mounted — the
/// container side of the pairing bidirectional sync.
const CONTAINER_WORKDIR: &str = "/workspace";

/// Everything a [`Command`] can fail with, collapsed to one error type the
/// way [`crate::vcs::GitError`] collapses git's failure modes. Each variant
/// just wraps the subsystem error that produced it.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Vcs(#[from] GitError),
    #[error(transparent)]
    GitHub(#[from] GitHubError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Pairing(#[from] PairingError),
    #[error("workstream {0} not found")]
    NotFound(u32),
}

/// Result of a completed [`Command`], fed back into the event loop as a
/// [`Msg`](crate::app::Msg) so `dispatch` can update workstream state.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    ContainerStarted { workstream_id: u32, container_id: String, worktree_path: String },
    ContainerResumed { workstream_id: u32, agent_session_id: Option<String> },
    ContainerStopped { workstream_id: u32 },
    TitleGenerated { workstream_id: u32, title: String },
    UncommittedChanges { workstream_id: u32, count: usize },
    UntrackedFiles { workstream_id: u32, count: usize },
    /// The branch a workstream was about to start on already exists in the
    /// real repository — caught by a live `git` check, not just by scanning
    /// in-manager workstream names, so this also fires for branches created
    /// outside Ringleader entirely.
    BranchConflict { workstream_id: u32, name: String, info: String },
    /// `StartContainer` found untracked files in the repo before branching;
    /// surfaced so the caller can decide whether to proceed anyway
    /// (`force: true`) rather than silently starting against a dirty tree.
    UntrackedFilesPrompt { workstream_id: u32, files: Vec<String> },
    Merged { workstream_id: u32 },
    Pushed { workstream_id: u32 },
    PullRequestOpened { workstream_id: u32, url: String, number: u64 },
    Pruned { removed: usize },
    StatePersisted,
    PairingBegun { workstream_id: u32 },
    /// `true` when a stash is left on the stack pairing didn't pop — the
    /// caller should hint the user to run `git stash pop` (see §4.7 and
    /// DESIGN.md).
    PairingEnded { stash_pending: bool },
    Exited,
}

const AGENT_IMAGE: &str = "ringleader/agent:latest";

/// Executes the side-effectful [`Command`]s `dispatch` produces: talking to
/// the container engine, the VCS adapter, the `gh` CLI, and the
/// persistence layer. Generalizes the teacher's `#[tauri::command]`
/// handlers — one async function per IPC call — into a single typed
/// dispatcher the UI event loop awaits instead of a Tauri runtime invoking
/// them.
pub struct CommandDispatcher {
    container: Arc<dyn ContainerAdapter>,
    vcs: Arc<dyn VcsAdapter>,
    github: GitHub,
    store: Store,
    pairing: Mutex<Pairing>,
    /// Path inside the container where the agent CLI persists its session
    /// state — copied out to the host worktree's `.agent-session` on
    /// shutdown, and read back on resume, so a container that was recreated
    /// from scratch can still pass `--resume <session-id>`.
    agent_session_files_path: String,
}

impl CommandDispatcher {
    pub fn new(
        container: Arc<dyn ContainerAdapter>,
        vcs: Arc<dyn VcsAdapter>,
        github: GitHub,
        store: Store,
        agent_session_files_path: impl Into<String>,
    ) -> Self {
        Self {
            container,
            vcs,
            github,
            store,
            pairing: Mutex::new(Pairing::new()),
            agent_session_files_path: agent_session_files_path.into(),
        }
    }

    /// Full argv for an interactive `exec` into a running container —
    /// passthrough so the PTY layer never has to know which engine
    /// (docker/podman) backs this dispatcher.
    pub fn exec_argv(&self, id: &str, argv: &[String]) -> Vec<String> {
        self.container.exec_argv(id, argv)
    }

    pub async fn execute(&self, command: Command, state: &AppState) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::StartContainer { workstream_id, branch, force } => {
                find(state, workstream_id)?;
                let branch_exists = self.vcs.branch_exists(&branch).await?;
                if !force {
                    if branch_exists || self.vcs.worktree_exists_for_branch(&branch).await? {
                        return Ok(CommandOutcome::BranchConflict {
                            workstream_id,
                            name: branch.clone(),
                            info: format!("branch '{branch}' already exists in the repository"),
                        });
                    }
                    let status = self.vcs.status().await?;
                    if !status.untracked.is_empty() {
                        return Ok(CommandOutcome::UntrackedFilesPrompt {
                            workstream_id,
                            files: status.untracked,
                        });
                    }
                }

                if !branch_exists {
                    self.vcs.create_branch(&branch, None).await?;
                }
                let worktree_path = self.vcs.create_worktree(&branch).await?;
                let worktree_str = worktree_path.to_string_lossy().to_string();

                let container_id = self
                    .container
                    .start(
                        AGENT_IMAGE,
                        &format!("ringleader-{workstream_id}"),
                        CONTAINER_WORKDIR,
                        &[(worktree_str.clone(), CONTAINER_WORKDIR.to_string())],
                    )
                    .await?;
                log::info!("started container {container_id} for workstream {workstream_id} ({branch})");
                Ok(CommandOutcome::ContainerStarted {
                    workstream_id,
                    container_id,
                    worktree_path: worktree_str,
                })
            }
            Command::ResumeContainer { workstream_id } => {
                let ws = find(state, workstream_id)?;
                let id = container_id_of(ws)?.to_string();
                self.container.resume(&id).await?;
                let agent_session_id = if ws.agent_session_id.is_empty() {
                    agent::extract_session_id(self.container.as_ref(), &id, &self.agent_session_files_path).await
                } else {
                    Some(ws.agent_session_id.clone())
                };
                Ok(CommandOutcome::ContainerResumed { workstream_id, agent_session_id })
            }
            Command::StopContainer { workstream_id } => {
                let ws = find(state, workstream_id)?;
                let id = container_id_of(ws)?;
                self.container.stop(id, 3).await?;
                if let Some(path) = ws.worktree_path.as_deref() {
                    if let Err(e) = self.vcs.remove_worktree(Path::new(path)).await {
                        log::warn!("failed to remove worktree {path} for workstream {workstream_id}: {e}");
                    }
                }
                Ok(CommandOutcome::ContainerStopped { workstream_id })
            }
            Command::GenerateTitle { workstream_id } => {
                let ws = find(state, workstream_id)?;
                Ok(CommandOutcome::TitleGenerated {
                    workstream_id,
                    title: title_from_branch(&ws.branch),
                })
            }
            Command::CheckUncommittedChanges { workstream_id } => {
                let status = self.vcs.status().await?;
                Ok(CommandOutcome::UncommittedChanges {
                    workstream_id,
                    count: status.modified.len(),
                })
            }
            Command::CheckUntrackedFiles { workstream_id } => {
                let status = self.vcs.status().await?;
                Ok(CommandOutcome::UntrackedFiles {
                    workstream_id,
                    count: status.untracked.len(),
                })
            }
            Command::MergeBranch { workstream_id, squash } => {
                let ws = find(state, workstream_id)?;
                if squash {
                    self.vcs.squash_merge(&ws.branch).await?;
                } else {
                    self.vcs.merge_branch(&ws.branch).await?;
                }
                Ok(CommandOutcome::Merged { workstream_id })
            }
            Command::Rebase { workstream_id, onto } => {
                self.vcs.rebase(&onto).await?;
                Ok(CommandOutcome::Merged { workstream_id })
            }
            Command::Push { workstream_id, force } => {
                let ws = find(state, workstream_id)?;
                self.vcs.push("origin", &ws.branch, force).await?;
                Ok(CommandOutcome::Pushed { workstream_id })
            }
            Command::CreatePullRequest { workstream_id, title, body, base } => {
                let ws = find(state, workstream_id)?;
                let pr = self
                    .github
                    .create_pull_request(CreatePullRequestOptions {
                        title,
                        body,
                        base,
                        head: ws.branch.clone(),
                        draft: false,
                    })
                    .await?;
                Ok(CommandOutcome::PullRequestOpened {
                    workstream_id,
                    url: pr.url,
                    number: pr.number,
                })
            }
            Command::PruneStopped | Command::PruneProject | Command::PruneAll => {
                let summaries = self.container.list().await?;
                let mut removed = 0;
                for summary in summaries.iter().filter(|s| !s.running) {
                    if self.container.remove(&summary.id, true).await.is_ok() {
                        removed += 1;
                    }
                }
                Ok(CommandOutcome::Pruned { removed })
            }
            Command::PersistState => {
                self.store.save(state).await?;
                Ok(CommandOutcome::StatePersisted)
            }
            Command::BeginPairing { workstream_id, branch } => {
                let ws = find(state, workstream_id)?;
                let host_path = PathBuf::from(ws.worktree_path.clone().unwrap_or_default());
                let container_path = PathBuf::from(CONTAINER_WORKDIR);
                let mut pairing = self.pairing.lock().await;
                pairing
                    .enable(
                        self.vcs.as_ref(),
                        &branch,
                        Box::new(NotifySyncEngine::new()),
                        host_path,
                        container_path,
                    )
                    .await?;
                Ok(CommandOutcome::PairingBegun { workstream_id })
            }
            Command::EndPairing => {
                let mut pairing = self.pairing.lock().await;
                let stash_pending = pairing.disable(self.vcs.as_ref()).await?;
                Ok(CommandOutcome::PairingEnded { stash_pending })
            }
            Command::Exit => {
                for ws in state.workstreams.iter() {
                    let Some(container_id) = ws.container_id.as_deref() else { continue };
                    if let Err(e) = self.container.signal_process(container_id, "SIGTERM").await {
                        log::warn!("failed to signal agent in workstream {}: {e}", ws.id);
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                for ws in state.workstreams.iter() {
                    let Some(container_id) = ws.container_id.as_deref() else { continue };
                    if let Err(e) = self.container.pause(container_id).await {
                        log::warn!("failed to pause container for workstream {}: {e}", ws.id);
                    }
                    if let Some(worktree) = ws.worktree_path.as_deref() {
                        let dest = PathBuf::from(worktree).join(".agent-session");
                        if let Err(e) = self
                            .container
                            .persist_session_files(container_id, &self.agent_session_files_path, &dest)
                            .await
                        {
                            log::warn!("failed to persist session files for workstream {}: {e}", ws.id);
                        }
                    }
                }
                if state.workstreams.is_empty() {
                    if let Err(e) = self.store.delete().await {
                        log::error!("failed to delete state file on shutdown: {e}");
                    }
                } else if let Err(e) = self.store.save(state).await {
                    log::error!("failed to persist state on shutdown: {e}");
                }
                Ok(CommandOutcome::Exited)
            }
        }
    }
}

fn find(state: &AppState, id: u32) -> Result<&crate::workstream::Workstream, CommandError> {
    state
        .workstreams
        .iter()
        .find(|w| w.id == id)
        .ok_or(CommandError::NotFound(id))
}

fn container_id_of(ws: &crate::workstream::Workstream) -> Result<&str, CommandError> {
    ws.container_id
        .as_deref()
        .ok_or_else(|| CommandError::Container(ContainerError::NotFound(ws.id.to_string())))
}

/// Heuristic, dependency-free title: turns `feature/fix-login-bug` into
/// `Fix login bug`. A placeholder for a future agent-generated summary —
/// good enough for the pane header and PR title defaults until one exists.
fn title_from_branch(branch: &str) -> String {
    let slug = branch.rsplit('/').next().unwrap_or(branch);
    let mut words = slug.split(['-', '_']).filter(|w| !w.is_empty());
    let mut title = String::new();
    if let Some(first) = words.next() {
        let mut chars = first.chars();
        if let Some(c) = chars.next() {
            title.push(c.to_ascii_uppercase());
            title.push_str(chars.as_str());
        }
    }
    for word in words {
        title.push(' ');
        title.push_str(word);
    }
    if title.is_empty() {
        branch.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_branch_humanizes_slug() {
        assert_eq!(title_from_branch("feature/fix-login-bug"), "Fix login bug");
        assert_eq!(title_from_branch("chore/bump_deps"), "Bump deps");
    }

    #[test]
    fn title_from_branch_falls_back_to_raw_name() {
        assert_eq!(title_from_branch("///"), "///");
    }
}
