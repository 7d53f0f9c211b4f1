//! Batch orchestration over a project's tasks.
//!
//! Tasks are released in waves of at most `batch_size`. A new wave is only
//! offered once nothing is in progress, so waves never overlap. Verdicts come
//! back through `complete_task`.

pub mod progress;

pub use progress::{Progress, format_progress};

use serde::Serialize;

use crate::callback::{Button, ButtonFactory, OrchAction};
use crate::db::Store;
use crate::errors::GridError;
use crate::models::{
    EventDetails, EventType, ReviewDetails, ReviewKind, Task, TaskStatus, TaskUpdateDetails,
    Verdict,
};

pub const DEFAULT_BATCH_SIZE: usize = 3;

/// A wave of tasks to hand to agents together.
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub tasks: Vec<Task>,
    pub parallel: bool,
}

impl Batch {
    pub fn task_numbers(&self) -> Vec<i64> {
        self.tasks.iter().map(|t| t.task_number).collect()
    }
}

/// What the caller should do next for a project.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Recommendation {
    SpawnBatch { batch: Batch, buttons: Vec<Button> },
    Waiting { in_progress: Vec<i64> },
    AllDone { buttons: Vec<Button> },
    /// Nothing pending or running, yet not every task is approved.
    Stalled { failed: Vec<i64> },
}

pub struct Orchestrator<'a> {
    store: &'a Store,
    batch_size: usize,
    buttons: ButtonFactory,
}

impl<'a> Orchestrator<'a> {
    pub fn new(store: &'a Store, batch_size: usize, buttons: ButtonFactory) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            buttons,
        }
    }

    fn tasks(&self, project_id: &str) -> Result<Vec<Task>, GridError> {
        if self.store.get_project(project_id)?.is_none() {
            return Err(GridError::ProjectNotFound {
                id: project_id.to_string(),
            });
        }
        Ok(self.store.list_tasks(project_id)?)
    }

    fn task_by_number(&self, project_id: &str, task_number: i64) -> Result<Task, GridError> {
        self.store
            .get_task_by_number(project_id, task_number)?
            .ok_or_else(|| GridError::TaskNotFound {
                project_id: project_id.to_string(),
                task_number,
            })
    }

    pub fn progress(&self, project_id: &str) -> Result<Progress, GridError> {
        Ok(Progress::from_tasks(&self.tasks(project_id)?))
    }

    /// Next wave of pending tasks, or `None` while a wave is running or
    /// when nothing is pending.
    pub fn next_batch(
        &self,
        project_id: &str,
        size: Option<usize>,
    ) -> Result<Option<Batch>, GridError> {
        let tasks = self.tasks(project_id)?;
        Ok(select_batch(tasks, size.unwrap_or(self.batch_size).max(1)))
    }

    /// Mark exactly the named tasks in progress.
    pub fn start_batch(&self, project_id: &str, numbers: &[i64]) -> Result<Vec<Task>, GridError> {
        let targets = numbers
            .iter()
            .map(|&n| self.task_by_number(project_id, n))
            .collect::<Result<Vec<_>, _>>()?;

        let details = EventDetails::TaskUpdate(TaskUpdateDetails {
            task_numbers: numbers.to_vec(),
            status: TaskStatus::InProgress,
        });
        let started = self.store.atomically(|store| {
            let mut started = Vec::with_capacity(targets.len());
            for task in &targets {
                if let Some(task) = store.start_task(&task.id)? {
                    started.push(task);
                }
            }
            store.create_event(project_id, EventType::TaskUpdate, Some(&details))?;
            Ok(started)
        })?;

        tracing::info!(project = project_id, tasks = ?numbers, "batch started");
        Ok(started)
    }

    /// Record a review verdict: approve on pass, fail on fail.
    pub fn complete_task(
        &self,
        project_id: &str,
        task_number: i64,
        verdict: Verdict,
        note: &str,
    ) -> Result<Task, GridError> {
        let task = self.task_by_number(project_id, task_number)?;
        let details = EventDetails::Review(ReviewDetails {
            task_number,
            verdict,
            note: note.to_string(),
        });

        let updated = self.store.atomically(|store| {
            for kind in [ReviewKind::Spec, ReviewKind::Quality] {
                store.set_task_review(&task.id, kind, &review_text(kind, verdict, note))?;
            }
            let updated = match verdict {
                Verdict::Pass => store.approve_task(&task.id)?,
                Verdict::Fail => store.update_task_status(&task.id, TaskStatus::Failed)?,
            };
            store.create_event(project_id, EventType::Review, Some(&details))?;
            Ok(updated)
        })?;

        tracing::info!(project = project_id, task = task_number, verdict = verdict.marker(), "task reviewed");
        updated.ok_or_else(|| GridError::TaskNotFound {
            project_id: project_id.to_string(),
            task_number,
        })
    }

    pub fn status(&self, project_id: &str) -> Result<Recommendation, GridError> {
        let tasks = self.tasks(project_id)?;

        let running: Vec<i64> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .map(|t| t.task_number)
            .collect();
        if !running.is_empty() {
            return Ok(Recommendation::Waiting {
                in_progress: running,
            });
        }

        if Progress::from_tasks(&tasks).is_complete() {
            return Ok(Recommendation::AllDone {
                buttons: self.buttons.orch_buttons(project_id, &OrchAction::Complete),
            });
        }

        let stalled: Vec<i64> = tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Approved)
            .map(|t| t.task_number)
            .collect();
        match select_batch(tasks, self.batch_size) {
            Some(batch) => {
                let buttons = self
                    .buttons
                    .orch_buttons(project_id, &OrchAction::Launch(batch.task_numbers()));
                Ok(Recommendation::SpawnBatch { batch, buttons })
            }
            None => Ok(Recommendation::Stalled { failed: stalled }),
        }
    }

    pub fn progress_message(&self, project_id: &str) -> Result<String, GridError> {
        Ok(format_progress(&self.tasks(project_id)?))
    }
}

fn select_batch(tasks: Vec<Task>, size: usize) -> Option<Batch> {
    if tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
        return None;
    }
    // list_tasks already orders by task_number
    let pending: Vec<Task> = tasks
        .into_iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .take(size)
        .collect();
    if pending.is_empty() {
        return None;
    }
    Some(Batch {
        tasks: pending,
        parallel: true,
    })
}

fn review_text(kind: ReviewKind, verdict: Verdict, note: &str) -> String {
    if note.is_empty() {
        format!("{} {}", kind.label(), verdict.marker())
    } else {
        format!("{} {}: {}", kind.label(), verdict.marker(), note)
    }
}
