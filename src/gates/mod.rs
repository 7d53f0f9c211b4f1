//! Phase gates and the forward-only project state machine.
//!
//! Each phase has a completion predicate evaluated against persisted state.
//! `advance` moves a project exactly one phase forward when the predicate for
//! its current phase holds, and records the transition as an event in the same
//! transaction.

use serde::Serialize;

use crate::db::Store;
use crate::errors::GridError;
use crate::models::{
    ApprovalDetails, Artifact, ArtifactStatus, ArtifactType, EventDetails, EventType, PhaseChange,
    Project, TaskStatus, WorktreeStatus,
};
use crate::phase::Phase;

/// Result of evaluating the gate for a project's current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Open,
    Blocked(String),
}

impl GateDecision {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Result of an advance attempt that reached the gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Advanced { from: Phase, to: Phase },
    Rejected { reason: String },
}

pub struct StateMachine<'a> {
    store: &'a Store,
}

impl<'a> StateMachine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    fn load_project(&self, project_id: &str) -> Result<Project, GridError> {
        self.store
            .get_project(project_id)?
            .ok_or_else(|| GridError::ProjectNotFound {
                id: project_id.to_string(),
            })
    }

    /// Evaluate the current phase's gate without changing anything.
    pub fn check_gate(&self, project_id: &str) -> Result<GateDecision, GridError> {
        let project = self.load_project(project_id)?;
        self.evaluate(&project)
    }

    fn evaluate(&self, project: &Project) -> Result<GateDecision, GridError> {
        let id = project.id.as_str();
        let decision = match project.phase {
            Phase::Brainstorm => {
                let designs = self.store.list_artifacts(id, Some(ArtifactType::Design))?;
                if designs.iter().any(|a| a.status == ArtifactStatus::Approved) {
                    GateDecision::Open
                } else {
                    GateDecision::Blocked(
                        "Brainstorm needs at least one approved design artifact".to_string(),
                    )
                }
            }
            Phase::Design => {
                let designs = self.store.list_artifacts(id, Some(ArtifactType::Design))?;
                let unapproved = designs
                    .iter()
                    .filter(|a| a.status != ArtifactStatus::Approved)
                    .count();
                if designs.is_empty() {
                    GateDecision::Blocked("Design has no design artifacts".to_string())
                } else if unapproved > 0 {
                    GateDecision::Blocked(format!(
                        "{} of {} design artifacts not approved",
                        unapproved,
                        designs.len()
                    ))
                } else {
                    GateDecision::Open
                }
            }
            Phase::Plan => {
                let plans = self.store.list_artifacts(id, Some(ArtifactType::Plan))?;
                let has_plan = plans.iter().any(|a| a.status == ArtifactStatus::Approved);
                let has_worktree = self
                    .store
                    .list_worktrees(id)?
                    .iter()
                    .any(|w| w.status == WorktreeStatus::Active);
                match (has_plan, has_worktree) {
                    (true, true) => GateDecision::Open,
                    (false, _) => GateDecision::Blocked(
                        "Plan needs at least one approved plan artifact".to_string(),
                    ),
                    (true, false) => {
                        GateDecision::Blocked("Plan needs an active worktree".to_string())
                    }
                }
            }
            Phase::Execute => {
                let tasks = self.store.list_tasks(id)?;
                let open = tasks
                    .iter()
                    .filter(|t| t.status != TaskStatus::Approved)
                    .count();
                if tasks.is_empty() {
                    GateDecision::Blocked("Execute has no tasks".to_string())
                } else if open > 0 {
                    GateDecision::Blocked(format!(
                        "{} of {} tasks not approved",
                        open,
                        tasks.len()
                    ))
                } else {
                    GateDecision::Open
                }
            }
            Phase::Review => GateDecision::Open,
            Phase::Done => GateDecision::Blocked("Project is already done".to_string()),
        };
        Ok(decision)
    }

    /// Move the project one phase forward if its current gate is open.
    pub fn advance(&self, project_id: &str) -> Result<AdvanceOutcome, GridError> {
        let project = self.load_project(project_id)?;
        let from = project.phase;
        let Some(to) = from.next() else {
            return Ok(AdvanceOutcome::Rejected {
                reason: "Project is already done".to_string(),
            });
        };

        if let GateDecision::Blocked(reason) = self.evaluate(&project)? {
            tracing::info!(project = project_id, phase = %from, %reason, "advance rejected");
            return Ok(AdvanceOutcome::Rejected { reason });
        }

        let details = EventDetails::PhaseChange(PhaseChange { from, to });
        self.store.atomically(|store| {
            store.update_project_phase(project_id, to)?;
            store.create_event(project_id, EventType::PhaseChange, Some(&details))?;
            Ok(())
        })?;

        tracing::info!(project = project_id, %from, %to, "phase advanced");
        Ok(AdvanceOutcome::Advanced { from, to })
    }

    /// Set an artifact's review status and log an approval event.
    pub fn review_artifact(
        &self,
        artifact_id: &str,
        status: ArtifactStatus,
        feedback: Option<&str>,
    ) -> Result<Artifact, GridError> {
        let artifact = self.store.atomically(|store| {
            let Some(artifact) = store.update_artifact_status(artifact_id, status, feedback)?
            else {
                return Ok(None);
            };
            let details = EventDetails::Approval(ApprovalDetails {
                artifact_id: artifact.id.clone(),
                status,
                feedback: feedback.map(str::to_string),
            });
            store.create_event(&artifact.project_id, EventType::Approval, Some(&details))?;
            Ok(Some(artifact))
        })?;

        artifact.ok_or_else(|| GridError::ArtifactNotFound {
            id: artifact_id.to_string(),
        })
    }
}
