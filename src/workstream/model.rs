use serde::{Deserialize, Serialize};

use crate::pane::Layout;

/// Lifecycle state of a workstream's container + agent session.
///
/// Unlike the permissive `SessionStatus` this replaces, transitions here are
/// enforced by [`super::manager::WorkstreamManager`]: `Error` is terminal
/// (a workstream never leaves it without being removed and recreated), and
/// `container_id` is only ever `Some` while `status` is `Running` or
/// `Paused` — never while `Starting`, `Stopped`, or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkstreamStatus {
    Starting,
    Running,
    Paused,
    NeedsInput,
    Stopped,
    Error,
}

impl WorkstreamStatus {
    /// `true` once a workstream can no longer self-recover; it must be
    /// explicitly removed.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkstreamStatus::Error)
    }

    /// Whether `next` is a transition this manager will accept from `self`.
    pub fn can_transition_to(self, next: WorkstreamStatus) -> bool {
        use WorkstreamStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, Error)
                | (Running, Paused)
                | (Running, NeedsInput)
                | (Running, Stopped)
                | (Running, Error)
                | (Paused, Running)
                | (Paused, Stopped)
                | (Paused, Error)
                | (NeedsInput, Running)
                | (NeedsInput, Stopped)
                | (NeedsInput, Error)
                | (Stopped, Running)
                | (Stopped, Error)
                | (_, Error)
        )
    }
}

/// A single workstream: one branch, one container, one agent session, one
/// PTY, one pane. Branch names are immutable after the first container
/// start — the branch a workstream was created for is the branch it keeps
/// for its whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workstream {
    pub id: u32,
    pub branch: String,
    pub container_id: Option<String>,
    pub status: WorkstreamStatus,
    pub pty_session_id: Option<u32>,
    pub worktree_path: Option<String>,
    /// Monotonic: once `true`, never reverts to `false` even if a later
    /// push fails — "has this branch ever reached the remote" is a
    /// one-way fact used to gate destructive prune operations.
    pub has_been_pushed: bool,
    pub pairing_enabled: bool,
    pub created_at_epoch_secs: i64,
    /// The opaque prompt text the user gave when this workstream was
    /// created. Defaults to empty for state files written before this
    /// field existed.
    #[serde(default)]
    pub initial_prompt: String,
    /// The in-container agent's own session identifier, captured from PTY
    /// output once observed. Empty until then; stable across suspend and
    /// resume, and passed back to the agent CLI's resume flag.
    #[serde(default)]
    pub agent_session_id: String,
    /// Set when the agent was mid-work (not idle) the last time this
    /// workstream's PTY was closed — drives the auto-continue behavior on
    /// the next successful resume. Cleared once consumed.
    #[serde(default)]
    pub was_interrupted: bool,
    #[serde(default)]
    pub pr_number: Option<u64>,
    #[serde(default)]
    pub pr_url: Option<String>,
}

impl Workstream {
    pub fn new(id: u32, branch: impl Into<String>, created_at_epoch_secs: i64) -> Self {
        Self {
            id,
            branch: branch.into(),
            container_id: None,
            status: WorkstreamStatus::Starting,
            pty_session_id: None,
            worktree_path: None,
            has_been_pushed: false,
            pairing_enabled: false,
            created_at_epoch_secs,
            initial_prompt: String::new(),
            agent_session_id: String::new(),
            was_interrupted: false,
            pr_number: None,
            pr_url: None,
        }
    }

    pub fn with_initial_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.initial_prompt = prompt.into();
        self
    }
}

/// Top-level application state persisted across runs: the ordered list of
/// workstreams, which one is focused, and the active pane layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    pub schema_version: u32,
    pub repo_fingerprint: String,
    pub workstreams: Vec<Workstream>,
    pub focused_index: Option<usize>,
    pub layout: Layout,
}

impl AppState {
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    pub fn new(repo_fingerprint: impl Into<String>) -> Self {
        Self {
            schema_version: Self::CURRENT_SCHEMA_VERSION,
            repo_fingerprint: repo_fingerprint.into(),
            workstreams: Vec::new(),
            focused_index: None,
            layout: Layout::Grid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_terminal() {
        assert!(WorkstreamStatus::Error.is_terminal());
        assert!(!WorkstreamStatus::Error.can_transition_to(WorkstreamStatus::Running));
    }

    #[test]
    fn running_can_pause_but_not_skip_to_stopped_from_starting() {
        assert!(WorkstreamStatus::Running.can_transition_to(WorkstreamStatus::Paused));
        assert!(!WorkstreamStatus::Starting.can_transition_to(WorkstreamStatus::Stopped));
    }
}
