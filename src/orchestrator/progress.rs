//! Task progress counts and the one-line progress bar.

use serde::Serialize;

use crate::models::{Task, TaskStatus};

pub const GLYPH_DONE: char = '🟢';
pub const GLYPH_RUNNING: char = '🔵';
pub const GLYPH_OTHER: char = '⚪';

/// Task counts for one project.
///
/// `pending` is everything neither approved nor running, so review and
/// failed tasks are included there; `failed` breaks out how many of those
/// are failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub failed: usize,
}

impl Progress {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let total = tasks.len();
        let done = count(TaskStatus::Approved);
        let in_progress = count(TaskStatus::InProgress);
        Self {
            done,
            total,
            pending: total - done - in_progress,
            in_progress,
            failed: count(TaskStatus::Failed),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

fn glyph(status: TaskStatus) -> char {
    match status {
        TaskStatus::Approved => GLYPH_DONE,
        TaskStatus::InProgress => GLYPH_RUNNING,
        _ => GLYPH_OTHER,
    }
}

/// Render tasks (already in task_number order) as a glyph strip plus counts.
pub fn format_progress(tasks: &[Task]) -> String {
    let progress = Progress::from_tasks(tasks);
    let strip: String = tasks.iter().map(|t| glyph(t.status)).collect();
    let mut line = format!(
        "{} {}/{} done, {} running, {} pending",
        strip, progress.done, progress.total, progress.in_progress, progress.pending
    );
    if progress.failed > 0 {
        line.push_str(&format!(" ({} failed)", progress.failed));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(n: i64, status: TaskStatus) -> Task {
        Task {
            id: format!("t{}", n),
            project_id: "p".into(),
            artifact_id: None,
            worktree_id: None,
            task_number: n,
            title: format!("Task {}", n),
            description: String::new(),
            status,
            agent_session: None,
            spec_review: None,
            quality_review: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_progress_buckets() {
        let tasks = vec![
            task(1, TaskStatus::Approved),
            task(2, TaskStatus::InProgress),
            task(3, TaskStatus::Failed),
            task(4, TaskStatus::Review),
            task(5, TaskStatus::Pending),
        ];
        let progress = Progress::from_tasks(&tasks);
        assert_eq!(
            progress,
            Progress {
                done: 1,
                total: 5,
                pending: 3,
                in_progress: 1,
                failed: 1,
            }
        );
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_empty_project_is_not_complete() {
        assert!(!Progress::from_tasks(&[]).is_complete());
    }

    #[test]
    fn test_format_progress_glyphs() {
        let tasks = vec![
            task(1, TaskStatus::Approved),
            task(2, TaskStatus::InProgress),
            task(3, TaskStatus::Pending),
        ];
        assert_eq!(
            format_progress(&tasks),
            "🟢🔵⚪ 1/3 done, 1 running, 1 pending"
        );
    }

    #[test]
    fn test_format_progress_mentions_failures() {
        let tasks = vec![task(1, TaskStatus::Failed)];
        assert!(format_progress(&tasks).ends_with("(1 failed)"));
    }
}
