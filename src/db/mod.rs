//! SQLite-backed store for projects, artifacts, worktrees, tasks and events.
//!
//! `Store` owns its connection and is passed by reference to the state
//! machine and orchestrator. Reads of unknown ids return `Ok(None)`; writes
//! that violate a constraint return an error immediately.

pub mod migrations;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::errors::GridError;
use crate::models::*;
use crate::phase::Phase;

/// Default cap for `list_events`.
pub const DEFAULT_EVENT_LIMIT: usize = 50;

const PROJECT_COLUMNS: &str = "id, name, repo_path, phase, model_config, created_at, updated_at";
const ARTIFACT_COLUMNS: &str =
    "id, project_id, type, content, file_path, status, feedback, created_at, updated_at";
const WORKTREE_COLUMNS: &str = "id, project_id, branch, path, status, created_at";
const TASK_COLUMNS: &str = "id, project_id, artifact_id, worktree_id, task_number, title, description, status, agent_session, spec_review, quality_review, started_at, completed_at, created_at";
const EVENT_COLUMNS: &str = "id, project_id, event_type, details, created_at";

/// Current time in the fixed-width RFC 3339 form stored in every timestamp column.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

fn parse_enum<T: FromStr<Err = String>>(raw: &str) -> Result<T> {
    T::from_str(raw).map_err(|e| anyhow::anyhow!(e))
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .context("Failed to enable WAL journal")?;
        let store = Self { conn };
        store.init()?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.conn
            .busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        migrations::apply(&self.conn, &migrations::embedded())
            .context("Failed to run migrations")?;
        Ok(())
    }

    /// Apply additional migrations from a directory of numbered `.sql` files.
    pub fn migrate_dir(&self, dir: &Path) -> Result<Vec<i64>> {
        let found = migrations::load_dir(dir)?;
        migrations::apply(&self.conn, &found)
    }

    /// Raw connection access for external tooling and tests.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one transaction; any error rolls every write back.
    pub fn atomically<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        // unchecked_transaction is fine here: the store is single-threaded and
        // never nests transactions.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let out = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(out)
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn create_project(&self, name: &str, repo_path: &str) -> Result<Project> {
        let id = Uuid::new_v4().to_string();
        let ts = now();
        self.conn
            .execute(
                "INSERT INTO projects (id, name, repo_path, phase, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, name, repo_path, Phase::Brainstorm.as_str(), ts],
            )
            .context("Failed to insert project")?;
        self.get_project(&id)?
            .context("Project not found after insert")
    }

    /// All projects, most recently updated first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY updated_at DESC, rowid DESC"
            ))
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], ProjectRow::from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?.into_project()?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                ProjectRow::from_row,
            )
            .optional()
            .context("Failed to query project")?;
        row.map(ProjectRow::into_project).transpose()
    }

    pub fn set_model_config(&self, id: &str, config: &ModelConfig) -> Result<Option<Project>> {
        let json = serde_json::to_string(config).context("Failed to serialize model config")?;
        let changed = self
            .conn
            .execute(
                "UPDATE projects SET model_config = ?1, updated_at = ?2 WHERE id = ?3",
                params![json, now(), id],
            )
            .context("Failed to update model config")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    pub fn update_project_phase(&self, id: &str, phase: Phase) -> Result<Option<Project>> {
        let changed = self
            .conn
            .execute(
                "UPDATE projects SET phase = ?1, updated_at = ?2 WHERE id = ?3",
                params![phase.as_str(), now(), id],
            )
            .context("Failed to update project phase")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    /// Project override for `phase` if set, else the static default.
    /// `None` when the project does not exist.
    pub fn get_model_for_phase(&self, project_id: &str, phase: Phase) -> Result<Option<String>> {
        let Some(project) = self.get_project(project_id)? else {
            return Ok(None);
        };
        let model = project
            .model_config
            .as_ref()
            .and_then(|cfg| cfg.get(&phase).cloned())
            .unwrap_or_else(|| phase.default_model().to_string());
        Ok(Some(model))
    }

    // ── Artifacts ─────────────────────────────────────────────────────

    pub fn create_artifact(
        &self,
        project_id: &str,
        artifact_type: ArtifactType,
        content: &str,
        file_path: Option<&str>,
    ) -> Result<Artifact> {
        let id = Uuid::new_v4().to_string();
        let ts = now();
        self.conn
            .execute(
                "INSERT INTO artifacts (id, project_id, type, content, file_path, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    id,
                    project_id,
                    artifact_type.as_str(),
                    content,
                    file_path,
                    ArtifactStatus::Draft.as_str(),
                    ts
                ],
            )
            .context("Failed to insert artifact")?;
        self.get_artifact(&id)?
            .context("Artifact not found after insert")
    }

    pub fn get_artifact(&self, id: &str) -> Result<Option<Artifact>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE id = ?1"),
                params![id],
                ArtifactRow::from_row,
            )
            .optional()
            .context("Failed to query artifact")?;
        row.map(ArtifactRow::into_artifact).transpose()
    }

    /// Artifacts for a project in creation order, optionally filtered by type.
    pub fn list_artifacts(
        &self,
        project_id: &str,
        artifact_type: Option<ArtifactType>,
    ) -> Result<Vec<Artifact>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ARTIFACT_COLUMNS} FROM artifacts
                 WHERE project_id = ?1 AND (?2 IS NULL OR type = ?2)
                 ORDER BY created_at, rowid"
            ))
            .context("Failed to prepare list_artifacts")?;
        let rows = stmt
            .query_map(
                params![project_id, artifact_type.map(|t| t.as_str())],
                ArtifactRow::from_row,
            )
            .context("Failed to query artifacts")?;
        let mut artifacts = Vec::new();
        for row in rows {
            artifacts.push(row.context("Failed to read artifact row")?.into_artifact()?);
        }
        Ok(artifacts)
    }

    pub fn update_artifact_status(
        &self,
        id: &str,
        status: ArtifactStatus,
        feedback: Option<&str>,
    ) -> Result<Option<Artifact>> {
        let changed = self
            .conn
            .execute(
                "UPDATE artifacts SET status = ?1, feedback = COALESCE(?2, feedback), updated_at = ?3
                 WHERE id = ?4",
                params![status.as_str(), feedback, now(), id],
            )
            .context("Failed to update artifact status")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_artifact(id)
    }

    // ── Worktrees ─────────────────────────────────────────────────────

    pub fn create_worktree(&self, project_id: &str, branch: &str, path: &str) -> Result<Worktree> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO worktrees (id, project_id, branch, path, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    project_id,
                    branch,
                    path,
                    WorktreeStatus::Active.as_str(),
                    now()
                ],
            )
            .context("Failed to insert worktree")?;
        self.get_worktree(&id)?
            .context("Worktree not found after insert")
    }

    pub fn get_worktree(&self, id: &str) -> Result<Option<Worktree>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {WORKTREE_COLUMNS} FROM worktrees WHERE id = ?1"),
                params![id],
                WorktreeRow::from_row,
            )
            .optional()
            .context("Failed to query worktree")?;
        row.map(WorktreeRow::into_worktree).transpose()
    }

    pub fn list_worktrees(&self, project_id: &str) -> Result<Vec<Worktree>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {WORKTREE_COLUMNS} FROM worktrees WHERE project_id = ?1
                 ORDER BY created_at, rowid"
            ))
            .context("Failed to prepare list_worktrees")?;
        let rows = stmt
            .query_map(params![project_id], WorktreeRow::from_row)
            .context("Failed to query worktrees")?;
        let mut worktrees = Vec::new();
        for row in rows {
            worktrees.push(row.context("Failed to read worktree row")?.into_worktree()?);
        }
        Ok(worktrees)
    }

    pub fn update_worktree_status(
        &self,
        id: &str,
        status: WorktreeStatus,
    ) -> Result<Option<Worktree>> {
        let changed = self
            .conn
            .execute(
                "UPDATE worktrees SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .context("Failed to update worktree status")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_worktree(id)
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    fn insert_task(&self, project_id: &str, task: &NewTask) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO tasks (id, project_id, artifact_id, worktree_id, task_number, title, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    project_id,
                    task.artifact_id,
                    task.worktree_id,
                    task.task_number,
                    task.title,
                    task.description,
                    TaskStatus::Pending.as_str(),
                    now()
                ],
            )
            .with_context(|| format!("Failed to insert task {}", task.task_number))?;
        Ok(id)
    }

    pub fn create_task(&self, project_id: &str, task: &NewTask) -> Result<Task> {
        let id = self.insert_task(project_id, task)?;
        self.get_task(&id)?.context("Task not found after insert")
    }

    /// Insert all tasks in one transaction, preserving the given order.
    pub fn create_task_batch(&self, project_id: &str, tasks: &[NewTask]) -> Result<Vec<Task>> {
        let ids = self.atomically(|store| {
            tasks
                .iter()
                .map(|task| store.insert_task(project_id, task))
                .collect::<Result<Vec<_>>>()
        })?;
        let mut created = Vec::with_capacity(ids.len());
        for id in ids {
            created.push(self.get_task(&id)?.context("Task not found after batch insert")?);
        }
        Ok(created)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                TaskRow::from_row,
            )
            .optional()
            .context("Failed to query task")?;
        row.map(TaskRow::into_task).transpose()
    }

    pub fn get_task_by_number(&self, project_id: &str, task_number: i64) -> Result<Option<Task>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 AND task_number = ?2"),
                params![project_id, task_number],
                TaskRow::from_row,
            )
            .optional()
            .context("Failed to query task by number")?;
        row.map(TaskRow::into_task).transpose()
    }

    /// Tasks for a project ordered by task_number.
    pub fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY task_number"),
            params![project_id],
        )
    }

    /// Tasks whose task_number lies in `from..=to`.
    pub fn get_task_batch(&self, project_id: &str, from: i64, to: i64) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE project_id = ?1 AND task_number BETWEEN ?2 AND ?3
                 ORDER BY task_number"
            ),
            params![project_id, from, to],
        )
    }

    fn query_tasks(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare task query")?;
        let rows = stmt
            .query_map(params, TaskRow::from_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.context("Failed to read task row")?.into_task()?);
        }
        Ok(tasks)
    }

    pub fn start_task(&self, id: &str) -> Result<Option<Task>> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET status = ?1, started_at = ?2, completed_at = NULL WHERE id = ?3",
                params![TaskStatus::InProgress.as_str(), now(), id],
            )
            .context("Failed to start task")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    /// Set a task's status. Leaving `approved` clears `completed_at`.
    pub fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET status = ?1,
                     completed_at = CASE WHEN ?1 = 'approved' THEN completed_at ELSE NULL END
                 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .context("Failed to update task status")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    pub fn set_task_review(&self, id: &str, kind: ReviewKind, result: &str) -> Result<Option<Task>> {
        let changed = self
            .conn
            .execute(
                &format!("UPDATE tasks SET {} = ?1 WHERE id = ?2", kind.column()),
                params![result, id],
            )
            .context("Failed to record task review")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    pub fn approve_task(&self, id: &str) -> Result<Option<Task>> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET status = ?1, completed_at = ?2 WHERE id = ?3",
                params![TaskStatus::Approved.as_str(), now(), id],
            )
            .context("Failed to approve task")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    pub fn set_task_agent(&self, id: &str, session_key: &str) -> Result<Option<Task>> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET agent_session = ?1 WHERE id = ?2",
                params![session_key, id],
            )
            .context("Failed to set task agent")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    // ── Events ────────────────────────────────────────────────────────

    /// Append an event. The payload, if any, must match `event_type`.
    pub fn create_event(
        &self,
        project_id: &str,
        event_type: EventType,
        details: Option<&EventDetails>,
    ) -> Result<Event> {
        let json = match details {
            Some(d) if d.event_type() != event_type => {
                return Err(GridError::MismatchedEventDetails {
                    event_type: event_type.as_str().to_string(),
                    payload: d.event_type().as_str().to_string(),
                }
                .into());
            }
            Some(d) => Some(serde_json::to_string(d).context("Failed to serialize event details")?),
            None => None,
        };
        self.conn
            .execute(
                "INSERT INTO events (project_id, event_type, details, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![project_id, event_type.as_str(), json, now()],
            )
            .context("Failed to insert event")?;
        let id = self.conn.last_insert_rowid();
        let row = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                EventRow::from_row,
            )
            .context("Event not found after insert")?;
        row.into_event()
    }

    /// Newest events first, capped at `limit` (default 50).
    pub fn list_events(&self, project_id: &str, limit: Option<usize>) -> Result<Vec<Event>> {
        let limit = limit.unwrap_or(DEFAULT_EVENT_LIMIT) as i64;
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE project_id = ?1 ORDER BY id DESC LIMIT ?2"
            ))
            .context("Failed to prepare list_events")?;
        let rows = stmt
            .query_map(params![project_id, limit], EventRow::from_row)
            .context("Failed to query events")?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row.context("Failed to read event row")?.into_event()?);
        }
        Ok(events)
    }
}

// ── Row types (raw column values before validation) ──────────────────

struct ProjectRow {
    id: String,
    name: String,
    repo_path: String,
    phase: String,
    model_config: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ProjectRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            repo_path: row.get(2)?,
            phase: row.get(3)?,
            model_config: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_project(self) -> Result<Project> {
        let model_config = self
            .model_config
            .as_deref()
            .map(serde_json::from_str::<ModelConfig>)
            .transpose()
            .with_context(|| format!("Invalid model_config for project {}", self.id))?;
        Ok(Project {
            phase: parse_enum(&self.phase)?,
            model_config,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            id: self.id,
            name: self.name,
            repo_path: self.repo_path,
        })
    }
}

struct ArtifactRow {
    id: String,
    project_id: String,
    artifact_type: String,
    content: String,
    file_path: Option<String>,
    status: String,
    feedback: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ArtifactRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            artifact_type: row.get(2)?,
            content: row.get(3)?,
            file_path: row.get(4)?,
            status: row.get(5)?,
            feedback: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_artifact(self) -> Result<Artifact> {
        Ok(Artifact {
            artifact_type: parse_enum(&self.artifact_type)?,
            status: parse_enum(&self.status)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            id: self.id,
            project_id: self.project_id,
            content: self.content,
            file_path: self.file_path,
            feedback: self.feedback,
        })
    }
}

struct WorktreeRow {
    id: String,
    project_id: String,
    branch: String,
    path: String,
    status: String,
    created_at: String,
}

impl WorktreeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            branch: row.get(2)?,
            path: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_worktree(self) -> Result<Worktree> {
        Ok(Worktree {
            status: parse_enum(&self.status)?,
            created_at: parse_ts(&self.created_at)?,
            id: self.id,
            project_id: self.project_id,
            branch: self.branch,
            path: self.path,
        })
    }
}

struct TaskRow {
    id: String,
    project_id: String,
    artifact_id: Option<String>,
    worktree_id: Option<String>,
    task_number: i64,
    title: String,
    description: String,
    status: String,
    agent_session: Option<String>,
    spec_review: Option<String>,
    quality_review: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            artifact_id: row.get(2)?,
            worktree_id: row.get(3)?,
            task_number: row.get(4)?,
            title: row.get(5)?,
            description: row.get(6)?,
            status: row.get(7)?,
            agent_session: row.get(8)?,
            spec_review: row.get(9)?,
            quality_review: row.get(10)?,
            started_at: row.get(11)?,
            completed_at: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        Ok(Task {
            status: parse_enum(&self.status)?,
            started_at: parse_opt_ts(self.started_at)?,
            completed_at: parse_opt_ts(self.completed_at)?,
            created_at: parse_ts(&self.created_at)?,
            id: self.id,
            project_id: self.project_id,
            artifact_id: self.artifact_id,
            worktree_id: self.worktree_id,
            task_number: self.task_number,
            title: self.title,
            description: self.description,
            agent_session: self.agent_session,
            spec_review: self.spec_review,
            quality_review: self.quality_review,
        })
    }
}

struct EventRow {
    id: i64,
    project_id: String,
    event_type: String,
    details: Option<String>,
    created_at: String,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            event_type: row.get(2)?,
            details: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_event(self) -> Result<Event> {
        let event_type: EventType = parse_enum(&self.event_type)?;
        let details = self
            .details
            .as_deref()
            .map(|raw| EventDetails::decode(event_type, raw))
            .transpose()
            .with_context(|| format!("Invalid details for event {}", self.id))?;
        Ok(Event {
            id: self.id,
            project_id: self.project_id,
            event_type,
            details,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
