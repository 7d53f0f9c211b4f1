//! Process-level git access and `worktree list --porcelain` parsing.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::errors::WorktreeError;

/// Runs git subcommands. Swappable so tests can avoid a real git binary.
pub trait GitRunner {
    /// Run `git <args>` in `cwd`, returning stdout on success.
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String, WorktreeError>;
}

/// Blocking `git` subprocess with no timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitRunner for SystemGit {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String, WorktreeError> {
        tracing::debug!(cwd = %cwd.display(), args = ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(WorktreeError::Spawn)?;

        if !output.status.success() {
            return Err(WorktreeError::CommandFailed {
                command: args.join(" "),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// One record from `git worktree list --porcelain`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub head: Option<String>,
    /// Short branch name (`refs/heads/` stripped).
    pub branch: Option<String>,
    pub detached: bool,
    pub bare: bool,
}

/// Parse porcelain output: attribute lines grouped into records by blank lines.
/// Records without a `worktree` line are dropped; unknown attributes are ignored.
pub fn parse_porcelain(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in output.lines().map(str::trim_end) {
        if line.is_empty() {
            entries.extend(current.take());
            continue;
        }
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "worktree" => {
                entries.extend(current.take());
                current = Some(WorktreeEntry {
                    path: PathBuf::from(value),
                    ..Default::default()
                });
            }
            "HEAD" => {
                if let Some(entry) = current.as_mut() {
                    entry.head = Some(value.to_string());
                }
            }
            "branch" => {
                if let Some(entry) = current.as_mut() {
                    let short = value.strip_prefix("refs/heads/").unwrap_or(value);
                    entry.branch = Some(short.to_string());
                }
            }
            "detached" => {
                if let Some(entry) = current.as_mut() {
                    entry.detached = true;
                }
            }
            "bare" => {
                if let Some(entry) = current.as_mut() {
                    entry.bare = true;
                }
            }
            _ => {}
        }
    }
    entries.extend(current);
    entries
}
