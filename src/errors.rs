//! Typed error hierarchy for the grid engine.
//!
//! Two enums cover the two failure surfaces:
//! - `GridError`: store lookups, payload validation, orchestration
//! - `WorktreeError`: git subprocess and repository failures

use std::path::PathBuf;
use thiserror::Error;

/// Errors from store-backed operations (state machine, orchestrator).
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: String },

    #[error("Task {task_number} not found in project {project_id}")]
    TaskNotFound { project_id: String, task_number: i64 },

    #[error("Artifact {id} not found")]
    ArtifactNotFound { id: String },

    #[error("Worktree {id} not found")]
    WorktreeNotFound { id: String },

    #[error("Event type {event_type} cannot carry a {payload} payload")]
    MismatchedEventDetails { event_type: String, payload: String },

    #[error("Invalid {field} '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Worktree(#[from] WorktreeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the worktree manager's git calls.
#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("Failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} failed (exit {status:?}): {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Worktree path contains invalid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Repository at {} has no working directory", .0.display())]
    BareRepository(PathBuf),

    #[error("Branch name '{0}' has no filesystem-safe characters")]
    InvalidBranch(String),

    #[error("Failed to open git repository: {0}")]
    Repository(#[from] git2::Error),

    #[error("Failed to prepare worktree directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
