use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::GitError;
use super::ops::RepoStatus;
use super::runner::Git;
use super::worktree::WorktreeManager;

/// Version-control operations the rest of Ringleader depends on, abstracted
/// behind a trait so commands and the pairing orchestrator can be tested
/// against an in-memory fake instead of a real git checkout.
///
/// Mirrors the adapter-over-CLI-runner split the container module uses for
/// the same reason: the runner owns process invocation, the adapter owns
/// the operation surface callers actually need.
#[async_trait]
pub trait VcsAdapter: Send + Sync {
    async fn current_branch(&self) -> Result<String, GitError>;
    async fn branch_exists(&self, name: &str) -> Result<bool, GitError>;
    async fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<(), GitError>;
    async fn delete_branch(&self, name: &str, force: bool) -> Result<(), GitError>;
    async fn status(&self) -> Result<RepoStatus, GitError>;
    async fn stash(&self, message: &str) -> Result<bool, GitError>;
    async fn stash_pop(&self) -> Result<(), GitError>;
    async fn checkout_branch(&self, name: &str) -> Result<(), GitError>;
    async fn merge_branch(&self, source: &str) -> Result<(), GitError>;
    async fn squash_merge(&self, source: &str) -> Result<(), GitError>;
    async fn rebase(&self, onto: &str) -> Result<(), GitError>;
    async fn push(&self, remote: &str, branch: &str, force: bool) -> Result<(), GitError>;
    async fn remote_url(&self, remote: &str) -> Result<Option<String>, GitError>;
    /// Checks out `branch` into its own managed worktree, returning the
    /// worktree's path on disk. Fails with `BranchAlreadyCheckedOut` if the
    /// branch is already checked out elsewhere.
    async fn create_worktree(&self, branch: &str) -> Result<PathBuf, GitError>;
    /// Force-removes a previously created worktree and prunes its git ref.
    async fn remove_worktree(&self, path: &Path) -> Result<(), GitError>;
    /// True if `branch` is already checked out in some worktree (managed or
    /// not) — the real git-level check behind branch-collision detection,
    /// as opposed to just scanning in-memory workstream names.
    async fn worktree_exists_for_branch(&self, branch: &str) -> Result<bool, GitError>;
}

#[async_trait]
impl VcsAdapter for Git {
    async fn current_branch(&self) -> Result<String, GitError> {
        Git::current_branch(self).await
    }
    async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        Git::branch_exists(self, name).await
    }
    async fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<(), GitError> {
        Git::create_branch(self, name, start_point).await
    }
    async fn delete_branch(&self, name: &str, force: bool) -> Result<(), GitError> {
        Git::delete_branch(self, name, force).await
    }
    async fn status(&self) -> Result<RepoStatus, GitError> {
        Git::status(self).await
    }
    async fn stash(&self, message: &str) -> Result<bool, GitError> {
        Git::stash(self, message).await
    }
    async fn stash_pop(&self) -> Result<(), GitError> {
        Git::stash_pop(self).await
    }
    async fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        Git::checkout_branch(self, name).await
    }
    async fn merge_branch(&self, source: &str) -> Result<(), GitError> {
        Git::merge_branch(self, source).await
    }
    async fn squash_merge(&self, source: &str) -> Result<(), GitError> {
        Git::squash_merge(self, source).await
    }
    async fn rebase(&self, onto: &str) -> Result<(), GitError> {
        Git::rebase(self, onto).await
    }
    async fn push(&self, remote: &str, branch: &str, force: bool) -> Result<(), GitError> {
        Git::push(self, remote, branch, force).await
    }
    async fn remote_url(&self, remote: &str) -> Result<Option<String>, GitError> {
        Git::remote_url(self, remote).await
    }
    async fn create_worktree(&self, branch: &str) -> Result<PathBuf, GitError> {
        WorktreeManager::new().create(branch, self.repo_path()).await
    }
    async fn remove_worktree(&self, path: &Path) -> Result<(), GitError> {
        WorktreeManager::new().remove(self.repo_path(), path).await
    }
    async fn worktree_exists_for_branch(&self, branch: &str) -> Result<bool, GitError> {
        Git::worktree_exists_for_branch(self, branch).await
    }
}

/// In-memory fake used by unit tests that exercise branch-uniqueness,
/// pairing, and command-dispatch logic without shelling out to git.
pub struct FakeVcs {
    pub current: Mutex<String>,
    pub branches: Mutex<Vec<String>>,
    pub stash_depth: Mutex<u32>,
    pub fail_merge: bool,
    pub worktrees: Mutex<HashMap<String, PathBuf>>,
}

impl FakeVcs {
    pub fn new(initial_branch: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(initial_branch.into()),
            branches: Mutex::new(Vec::new()),
            stash_depth: Mutex::new(0),
            fail_merge: false,
            worktrees: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VcsAdapter for FakeVcs {
    async fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.current.lock().unwrap().clone())
    }
    async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        Ok(self.branches.lock().unwrap().iter().any(|b| b == name))
    }
    async fn create_branch(&self, name: &str, _start_point: Option<&str>) -> Result<(), GitError> {
        self.branches.lock().unwrap().push(name.to_string());
        Ok(())
    }
    async fn delete_branch(&self, name: &str, _force: bool) -> Result<(), GitError> {
        self.branches.lock().unwrap().retain(|b| b != name);
        Ok(())
    }
    async fn status(&self) -> Result<RepoStatus, GitError> {
        Ok(RepoStatus::default())
    }
    async fn stash(&self, _message: &str) -> Result<bool, GitError> {
        *self.stash_depth.lock().unwrap() += 1;
        Ok(true)
    }
    async fn stash_pop(&self) -> Result<(), GitError> {
        let mut depth = self.stash_depth.lock().unwrap();
        if *depth == 0 {
            return Err(GitError::NoStashEntry);
        }
        *depth -= 1;
        Ok(())
    }
    async fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        *self.current.lock().unwrap() = name.to_string();
        Ok(())
    }
    async fn merge_branch(&self, _source: &str) -> Result<(), GitError> {
        if self.fail_merge {
            return Err(GitError::MergeConflict {
                files: vec!["conflicted.rs".to_string()],
            });
        }
        Ok(())
    }
    async fn squash_merge(&self, source: &str) -> Result<(), GitError> {
        self.merge_branch(source).await
    }
    async fn rebase(&self, _onto: &str) -> Result<(), GitError> {
        if self.fail_merge {
            return Err(GitError::MergeConflict {
                files: vec!["conflicted.rs".to_string()],
            });
        }
        Ok(())
    }
    async fn push(&self, _remote: &str, _branch: &str, _force: bool) -> Result<(), GitError> {
        Ok(())
    }
    async fn remote_url(&self, _remote: &str) -> Result<Option<String>, GitError> {
        Ok(None)
    }
    async fn create_worktree(&self, branch: &str) -> Result<PathBuf, GitError> {
        let mut worktrees = self.worktrees.lock().unwrap();
        if let Some(path) = worktrees.get(branch) {
            return Err(GitError::BranchAlreadyCheckedOut {
                branch: branch.to_string(),
                path: path.to_string_lossy().to_string(),
            });
        }
        let path = PathBuf::from(format!("/fake-worktrees/{branch}"));
        worktrees.insert(branch.to_string(), path.clone());
        Ok(path)
    }
    async fn remove_worktree(&self, path: &Path) -> Result<(), GitError> {
        let mut worktrees = self.worktrees.lock().unwrap();
        let before = worktrees.len();
        worktrees.retain(|_, p| p != path);
        if worktrees.len() == before {
            return Err(GitError::WorktreeNotFound(path.to_string_lossy().to_string()));
        }
        Ok(())
    }
    async fn worktree_exists_for_branch(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.worktrees.lock().unwrap().contains_key(branch))
    }
}

/// Derives the stable fingerprint used to key per-repo state (persistence
/// location, worktree base directory). Exposed alongside the adapter trait
/// since callers resolving a `VcsAdapter` almost always need this too.
pub async fn fingerprint(repo_path: &Path) -> String {
    super::worktree::repo_hash(repo_path).await
}

pub fn canonical_repo_path(repo_path: &Path) -> PathBuf {
    repo_path.to_path_buf()
}
