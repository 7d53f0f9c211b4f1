pub mod git;
pub mod worktree;

pub use git::{GitRunner, SystemGit, WorktreeEntry, parse_porcelain};
pub use worktree::{WORKTREE_DIR, WorktreeManager, provision, release, sanitize_branch};
