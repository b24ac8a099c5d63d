use std::collections::HashMap;

use thiserror::Error;

use super::model::{AppState, Workstream, WorkstreamStatus};

/// Errors enforcing the workstream manager's invariants — shaped like
/// [`crate::vcs::GitError`]/[`crate::pty::PtyError`]: one enum, one
/// `Display` message per variant.
#[derive(Debug, Error)]
pub enum WorkstreamError {
    #[error("branch '{0}' is already in use by another workstream")]
    BranchInUse(String),

    #[error("at capacity: {max} workstreams already active")]
    AtCapacity { max: usize },

    #[error("pairing is already active on workstream {0}")]
    PairingAlreadyActive(u32),

    #[error("workstream {0} not found")]
    NotFound(u32),

    #[error("workstream {0} already has a running container; its branch can't be changed")]
    BranchImmutable(u32),

    #[error("invalid transition for workstream {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: u32,
        from: WorkstreamStatus,
        to: WorkstreamStatus,
    },
}

/// Owns the ordered set of workstreams for one repository and enforces the
/// invariants the model itself can't: no two workstreams share a branch, at
/// most one has pairing enabled, and the set never exceeds `max_workstreams`.
///
/// Only ever touched from the single-threaded UI plane (see the
/// concurrency model), so this keeps a plain insertion-ordered `Vec` plus
/// an index map rather than a concurrent map — no locking needed.
pub struct WorkstreamManager {
    state: AppState,
    index: HashMap<u32, usize>,
    next_id: u32,
    max_workstreams: usize,
}

impl WorkstreamManager {
    pub fn new(repo_fingerprint: impl Into<String>, max_workstreams: usize) -> Self {
        Self {
            state: AppState::new(repo_fingerprint),
            index: HashMap::new(),
            next_id: 1,
            max_workstreams,
        }
    }

    /// Restores a manager from a previously persisted [`AppState`],
    /// rebuilding the id->index map and continuing the id counter past the
    /// highest loaded id so restarts never reissue an id.
    pub fn from_state(state: AppState, max_workstreams: usize) -> Self {
        let mut index = HashMap::new();
        let mut next_id = 1;
        for (i, ws) in state.workstreams.iter().enumerate() {
            index.insert(ws.id, i);
            next_id = next_id.max(ws.id + 1);
        }
        Self {
            state,
            index,
            next_id,
            max_workstreams,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn get(&self, id: u32) -> Option<&Workstream> {
        self.index.get(&id).and_then(|&i| self.state.workstreams.get(i))
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Workstream> {
        let idx = *self.index.get(&id)?;
        self.state.workstreams.get_mut(idx)
    }

    /// Creates a new workstream on `branch` with no initial prompt.
    /// Enforces branch uniqueness and the capacity limit before allocating
    /// an id.
    pub fn create(&mut self, branch: &str, now_epoch_secs: i64) -> Result<u32, WorkstreamError> {
        self.create_with_prompt(branch, now_epoch_secs, "")
    }

    /// As [`Self::create`], but also records the prompt the workstream was
    /// created with — passed to the agent CLI as its final positional
    /// argument when the container starts.
    pub fn create_with_prompt(
        &mut self,
        branch: &str,
        now_epoch_secs: i64,
        initial_prompt: &str,
    ) -> Result<u32, WorkstreamError> {
        if self.state.workstreams.iter().any(|w| w.branch == branch) {
            return Err(WorkstreamError::BranchInUse(branch.to_string()));
        }
        if self.state.workstreams.len() >= self.max_workstreams {
            return Err(WorkstreamError::AtCapacity {
                max: self.max_workstreams,
            });
        }

        let id = self.next_id;
        self.next_id += 1;

        let ws = Workstream::new(id, branch, now_epoch_secs).with_initial_prompt(initial_prompt);
        self.index.insert(id, self.state.workstreams.len());
        self.state.workstreams.push(ws);
        Ok(id)
    }

    /// Every branch name currently in use, for uniqueness-suffix generation
    /// before a workstream (and thus its branch) exists.
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.state.workstreams.iter().map(|w| w.branch.as_str())
    }

    /// Renames `id`'s branch before its first container start, used when the
    /// chosen branch turns out to already exist in the real repository (a
    /// collision `branch_names()` alone can't see, since it only knows
    /// about branches other workstreams here already claimed). Rejects the
    /// rename once a container has started — branch names are immutable
    /// past that point — and rejects a `new_branch` already claimed by
    /// another workstream.
    pub fn rename_branch_before_start(&mut self, id: u32, new_branch: &str) -> Result<(), WorkstreamError> {
        if self.state.workstreams.iter().any(|w| w.id != id && w.branch == new_branch) {
            return Err(WorkstreamError::BranchInUse(new_branch.to_string()));
        }
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        if ws.container_id.is_some() {
            return Err(WorkstreamError::BranchImmutable(id));
        }
        ws.branch = new_branch.to_string();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workstream> {
        self.state.workstreams.iter()
    }

    /// Applies a status transition, rejecting any move the workstream's
    /// lifecycle doesn't allow (e.g. out of the terminal `Error` state).
    pub fn transition(&mut self, id: u32, next: WorkstreamStatus) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        if !ws.status.can_transition_to(next) {
            return Err(WorkstreamError::InvalidTransition {
                id,
                from: ws.status,
                to: next,
            });
        }
        ws.status = next;
        Ok(())
    }

    pub fn set_container_id(&mut self, id: u32, container_id: Option<String>) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.container_id = container_id;
        Ok(())
    }

    pub fn set_pty_session(&mut self, id: u32, pty_session_id: Option<u32>) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.pty_session_id = pty_session_id;
        Ok(())
    }

    pub fn set_worktree_path(&mut self, id: u32, path: Option<String>) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.worktree_path = path;
        Ok(())
    }

    pub fn set_agent_session_id(&mut self, id: u32, session_id: impl Into<String>) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.agent_session_id = session_id.into();
        Ok(())
    }

    pub fn set_was_interrupted(&mut self, id: u32, value: bool) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.was_interrupted = value;
        Ok(())
    }

    pub fn set_pull_request(&mut self, id: u32, number: u64, url: impl Into<String>) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.pr_number = Some(number);
        ws.pr_url = Some(url.into());
        Ok(())
    }

    /// Marks a workstream as having reached the remote at least once. Never
    /// clears this flag — see [`Workstream::has_been_pushed`].
    pub fn mark_pushed(&mut self, id: u32) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.has_been_pushed = true;
        Ok(())
    }

    /// Enables pairing on `id`, rejecting the request if any other
    /// workstream already has pairing enabled (the singleton invariant).
    pub fn enable_pairing(&mut self, id: u32) -> Result<(), WorkstreamError> {
        if let Some(existing) = self.state.workstreams.iter().find(|w| w.pairing_enabled) {
            if existing.id != id {
                return Err(WorkstreamError::PairingAlreadyActive(existing.id));
            }
        }
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.pairing_enabled = true;
        Ok(())
    }

    pub fn disable_pairing(&mut self, id: u32) -> Result<(), WorkstreamError> {
        let ws = self.get_mut(id).ok_or(WorkstreamError::NotFound(id))?;
        ws.pairing_enabled = false;
        Ok(())
    }

    /// Removes a workstream entirely. Re-indexes the remaining entries so
    /// `index` stays consistent with `state.workstreams`'s positions.
    pub fn remove(&mut self, id: u32) -> Result<Workstream, WorkstreamError> {
        let idx = self.index.remove(&id).ok_or(WorkstreamError::NotFound(id))?;
        let removed = self.state.workstreams.remove(idx);
        for (_, i) in self.index.iter_mut() {
            if *i > idx {
                *i -= 1;
            }
        }
        if self.state.focused_index == Some(idx) {
            self.state.focused_index = None;
        }
        Ok(removed)
    }

    pub fn focus(&mut self, id: u32) -> Result<(), WorkstreamError> {
        let idx = *self.index.get(&id).ok_or(WorkstreamError::NotFound(id))?;
        self.state.focused_index = Some(idx);
        Ok(())
    }

    pub fn focused(&self) -> Option<&Workstream> {
        self.state.focused_index.and_then(|i| self.state.workstreams.get(i))
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.state.focused_index
    }

    pub fn focus_index(&mut self, index: usize) {
        if index < self.state.workstreams.len() {
            self.state.focused_index = Some(index);
        }
    }

    pub fn set_layout(&mut self, layout: crate::pane::Layout) {
        self.state.layout = layout;
    }

    pub fn layout(&self) -> crate::pane::Layout {
        self.state.layout
    }

    pub fn len(&self) -> usize {
        self.state.workstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.workstreams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_branch() {
        let mut mgr = WorkstreamManager::new("repo", 9);
        mgr.create("feature-a", 0).unwrap();
        let err = mgr.create("feature-a", 0).unwrap_err();
        assert!(matches!(err, WorkstreamError::BranchInUse(b) if b == "feature-a"));
    }

    #[test]
    fn enforces_capacity() {
        let mut mgr = WorkstreamManager::new("repo", 2);
        mgr.create("a", 0).unwrap();
        mgr.create("b", 0).unwrap();
        let err = mgr.create("c", 0).unwrap_err();
        assert!(matches!(err, WorkstreamError::AtCapacity { max: 2 }));
    }

    #[test]
    fn only_one_workstream_may_have_pairing_enabled() {
        let mut mgr = WorkstreamManager::new("repo", 9);
        let a = mgr.create("a", 0).unwrap();
        let b = mgr.create("b", 0).unwrap();
        mgr.enable_pairing(a).unwrap();
        let err = mgr.enable_pairing(b).unwrap_err();
        assert!(matches!(err, WorkstreamError::PairingAlreadyActive(id) if id == a));
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut mgr = WorkstreamManager::new("repo", 9);
        let a = mgr.create("a", 0).unwrap();
        mgr.remove(a).unwrap();
        let b = mgr.create("b", 0).unwrap();
        assert!(b > a);
    }

    #[test]
    fn rename_branch_before_start_rejects_collision_and_started_container() {
        let mut mgr = WorkstreamManager::new("repo", 9);
        let a = mgr.create("a", 0).unwrap();
        let b = mgr.create("b", 0).unwrap();

        let err = mgr.rename_branch_before_start(a, "b").unwrap_err();
        assert!(matches!(err, WorkstreamError::BranchInUse(name) if name == "b"));

        mgr.rename_branch_before_start(a, "a-2").unwrap();
        assert_eq!(mgr.get(a).unwrap().branch, "a-2");

        mgr.set_container_id(b, Some("container-1".to_string())).unwrap();
        let err = mgr.rename_branch_before_start(b, "b-2").unwrap_err();
        assert!(matches!(err, WorkstreamError::BranchImmutable(id) if id == b));
    }

    #[test]
    fn has_been_pushed_is_monotonic() {
        let mut mgr = WorkstreamManager::new("repo", 9);
        let a = mgr.create("a", 0).unwrap();
        mgr.mark_pushed(a).unwrap();
        assert!(mgr.get(a).unwrap().has_been_pushed);
    }
}
