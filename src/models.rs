use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Per-phase model overrides for a project.
pub type ModelConfig = BTreeMap<Phase, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repo_path: String,
    pub phase: Phase,
    pub model_config: Option<ModelConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Design,
    Plan,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Plan => "plan",
        }
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design" => Ok(Self::Design),
            "plan" => Ok(Self::Plan),
            _ => Err(format!("Invalid artifact type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ArtifactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid artifact status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub content: String,
    pub file_path: Option<String>,
    pub status: ArtifactStatus,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorktreeStatus {
    Active,
    Merged,
    Discarded,
}

impl WorktreeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Merged => "merged",
            Self::Discarded => "discarded",
        }
    }
}

impl FromStr for WorktreeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "merged" => Ok(Self::Merged),
            "discarded" => Ok(Self::Discarded),
            _ => Err(format!("Invalid worktree status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worktree {
    pub id: String,
    pub project_id: String,
    pub branch: String,
    pub path: String,
    pub status: WorktreeStatus,
    pub created_at: DateTime<Utc>,
}

/// Task lifecycle status. `in_progress` is the canonical spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Review,
    Approved,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    // Accepts the hyphenated spelling some callers send and normalizes it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "approved" => Ok(Self::Approved),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which review column a verdict is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    Spec,
    Quality,
}

impl ReviewKind {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Spec => "spec_review",
            Self::Quality => "quality_review",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Spec => "Spec review",
            Self::Quality => "Quality review",
        }
    }
}

/// Pass/fail outcome of a task review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            _ => Err(format!("Invalid verdict '{}'. Valid values: pass, fail", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub artifact_id: Option<String>,
    pub worktree_id: Option<String>,
    pub task_number: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub agent_session: Option<String>,
    pub spec_review: Option<String>,
    pub quality_review: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for task creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub task_number: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub worktree_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PhaseChange,
    Approval,
    TaskUpdate,
    Review,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhaseChange => "phase_change",
            Self::Approval => "approval",
            Self::TaskUpdate => "task_update",
            Self::Review => "review",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phase_change" => Ok(Self::PhaseChange),
            "approval" => Ok(Self::Approval),
            "task_update" => Ok(Self::TaskUpdate),
            "review" => Ok(Self::Review),
            _ => Err(format!("Invalid event type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDetails {
    pub artifact_id: String,
    pub status: ArtifactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdateDetails {
    pub task_numbers: Vec<i64>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDetails {
    pub task_number: i64,
    pub verdict: Verdict,
    pub note: String,
}

/// Structured event payload, one shape per event type.
///
/// Persisted as the bare payload object; the row's `event_type` selects the
/// shape on the way back out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventDetails {
    PhaseChange(PhaseChange),
    Approval(ApprovalDetails),
    TaskUpdate(TaskUpdateDetails),
    Review(ReviewDetails),
}

impl EventDetails {
    /// The only event type this payload may be attached to.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PhaseChange(_) => EventType::PhaseChange,
            Self::Approval(_) => EventType::Approval,
            Self::TaskUpdate(_) => EventType::TaskUpdate,
            Self::Review(_) => EventType::Review,
        }
    }

    pub fn decode(event_type: EventType, raw: &str) -> serde_json::Result<Self> {
        Ok(match event_type {
            EventType::PhaseChange => Self::PhaseChange(serde_json::from_str(raw)?),
            EventType::Approval => Self::Approval(serde_json::from_str(raw)?),
            EventType::TaskUpdate => Self::TaskUpdate(serde_json::from_str(raw)?),
            EventType::Review => Self::Review(serde_json::from_str(raw)?),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub project_id: String,
    pub event_type: EventType,
    pub details: Option<EventDetails>,
    pub created_at: DateTime<Utc>,
}
