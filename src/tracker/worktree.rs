//! Git worktree lifecycle, plus store bookkeeping for it.

use std::path::{Path, PathBuf};

use git2::Repository;

use super::git::{GitRunner, SystemGit, WorktreeEntry, parse_porcelain};
use crate::db::Store;
use crate::errors::{GridError, WorktreeError};
use crate::models::{Worktree, WorktreeStatus};

/// Directory, next to the repository, that holds all linked worktrees.
pub const WORKTREE_DIR: &str = ".worktrees";

/// Map a branch name to a directory name: `[A-Za-z0-9._-]` kept, anything
/// else becomes `-`.
pub fn sanitize_branch(branch: &str) -> String {
    branch
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub struct WorktreeManager<R: GitRunner = SystemGit> {
    repo_root: PathBuf,
    runner: R,
}

impl WorktreeManager<SystemGit> {
    /// Resolve the working-tree root containing `repo_path`.
    pub fn open(repo_path: &Path) -> Result<Self, WorktreeError> {
        let repo = Repository::discover(repo_path)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| WorktreeError::BareRepository(repo_path.to_path_buf()))?;
        // workdir() carries a trailing separator; rebuilding from components drops it
        let repo_root: PathBuf = workdir.components().collect();
        Ok(Self::with_runner(repo_root, SystemGit))
    }
}

impl<R: GitRunner> WorktreeManager<R> {
    pub fn with_runner(repo_root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            repo_root: repo_root.into(),
            runner,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Where a worktree for `branch` lives.
    pub fn path_for(&self, branch: &str) -> Result<PathBuf, WorktreeError> {
        let safe = sanitize_branch(branch);
        if safe.trim_matches(['-', '.']).is_empty() {
            return Err(WorktreeError::InvalidBranch(branch.to_string()));
        }
        let base = self.repo_root.parent().unwrap_or(&self.repo_root);
        let path = base.join(WORKTREE_DIR).join(safe);
        std::path::absolute(&path).map_err(|source| WorktreeError::Io { path, source })
    }

    /// Create a new branch checked out in a fresh worktree; returns its absolute path.
    pub fn create(&self, branch: &str) -> Result<PathBuf, WorktreeError> {
        let path = self.path_for(branch)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| WorktreeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| WorktreeError::InvalidPath(path.clone()))?;

        self.runner
            .run(&self.repo_root, &["worktree", "add", "-b", branch, path_str])?;
        tracing::info!(branch, path = %path.display(), "worktree created");
        Ok(path)
    }

    pub fn list(&self) -> Result<Vec<WorktreeEntry>, WorktreeError> {
        let out = self
            .runner
            .run(&self.repo_root, &["worktree", "list", "--porcelain"])?;
        Ok(parse_porcelain(&out))
    }

    /// Force-remove a worktree. The branch is left in place.
    pub fn remove(&self, path: &Path) -> Result<(), WorktreeError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| WorktreeError::InvalidPath(path.to_path_buf()))?;
        self.runner
            .run(&self.repo_root, &["worktree", "remove", "--force", path_str])?;
        tracing::info!(path = %path.display(), "worktree removed");
        Ok(())
    }
}

/// Create a git worktree for `branch` and record it against the project.
pub fn provision<R: GitRunner>(
    store: &Store,
    manager: &WorktreeManager<R>,
    project_id: &str,
    branch: &str,
) -> Result<Worktree, GridError> {
    if store.get_project(project_id)?.is_none() {
        return Err(GridError::ProjectNotFound {
            id: project_id.to_string(),
        });
    }
    let path = manager.create(branch)?;
    let path_str = path.to_string_lossy();
    match store.create_worktree(project_id, branch, &path_str) {
        Ok(worktree) => Ok(worktree),
        Err(err) => {
            // Keep git and the store in step: undo the checkout we just made.
            if let Err(cleanup) = manager.remove(&path) {
                tracing::warn!(path = %path_str, error = %cleanup, "failed to roll back worktree");
            }
            Err(err.into())
        }
    }
}

/// Remove an active worktree from disk and mark it merged or discarded.
pub fn release<R: GitRunner>(
    store: &Store,
    manager: &WorktreeManager<R>,
    worktree_id: &str,
    status: WorktreeStatus,
) -> Result<Worktree, GridError> {
    if status == WorktreeStatus::Active {
        return Err(GridError::InvalidValue {
            field: "release status",
            value: status.as_str().to_string(),
        });
    }
    let worktree = store
        .get_worktree(worktree_id)?
        .ok_or_else(|| GridError::WorktreeNotFound {
            id: worktree_id.to_string(),
        })?;
    if worktree.status != WorktreeStatus::Active {
        return Err(GridError::InvalidValue {
            field: "worktree status",
            value: worktree.status.as_str().to_string(),
        });
    }

    manager.remove(Path::new(&worktree.path))?;
    store
        .update_worktree_status(worktree_id, status)?
        .ok_or_else(|| GridError::WorktreeNotFound {
            id: worktree_id.to_string(),
        })
}
