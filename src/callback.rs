//! Compact callback tokens for chat-bot buttons.
//!
//! Tokens look like `grid:<action>:<id>[:<extra>]`. `parse` is total: any
//! malformed input yields `None`, never a panic.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub const PREFIX: &str = "grid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Reject,
    View,
    Continue,
    Pause,
    Advance,
    Batch,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::View => "view",
            Self::Continue => "continue",
            Self::Pause => "pause",
            Self::Advance => "advance",
            Self::Batch => "batch",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "view" => Ok(Self::View),
            "continue" => Ok(Self::Continue),
            "pause" => Ok(Self::Pause),
            "advance" => Ok(Self::Advance),
            "batch" => Ok(Self::Batch),
            _ => Err(format!("Unknown callback action: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackData {
    pub action: Action,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl CallbackData {
    pub fn new(action: Action, id: impl Into<String>) -> Self {
        Self {
            action,
            id: id.into(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        let extra = extra.into();
        self.extra = (!extra.is_empty()).then_some(extra);
        self
    }

    /// A `batch` token carrying task numbers.
    pub fn batch(project_id: &str, task_numbers: &[i64]) -> Self {
        let list = task_numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self::new(Action::Batch, project_id).with_extra(list)
    }

    /// Decode the comma-separated task list in `extra`.
    /// `None` when there is no extra or any entry is not a number.
    pub fn task_numbers(&self) -> Option<Vec<i64>> {
        self.extra
            .as_deref()?
            .split(',')
            .map(|n| n.trim().parse::<i64>().ok())
            .collect()
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", PREFIX, self.action.as_str(), self.id)?;
        if let Some(extra) = &self.extra {
            write!(f, ":{}", extra)?;
        }
        Ok(())
    }
}

/// Decode a callback token.
pub fn parse(raw: &str) -> Option<CallbackData> {
    let mut parts = raw.splitn(4, ':');
    if parts.next()? != PREFIX {
        return None;
    }
    let action = parts.next()?.parse::<Action>().ok()?;
    let id = parts.next().filter(|id| !id.is_empty())?;
    let extra = parts.next().filter(|e| !e.is_empty());
    Some(CallbackData {
        action,
        id: id.to_string(),
        extra: extra.map(str::to_string),
    })
}

/// A chat button: either a callback token or a plain link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Button {
    Callback { text: String, callback_data: String },
    Link { text: String, url: String },
}

impl Button {
    fn callback(text: &str, data: CallbackData) -> Self {
        Self::Callback {
            text: text.to_string(),
            callback_data: data.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Callback { text, .. } | Self::Link { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    Approval {
        artifact_id: String,
        project_id: String,
    },
    Checkpoint {
        project_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchAction {
    Launch(Vec<i64>),
    Advance,
    Progress,
    /// Every task approved: advance, progress and a dashboard link.
    Complete,
}

/// Builds button rows; links point at the configured dashboard.
#[derive(Debug, Clone)]
pub struct ButtonFactory {
    dashboard_url: String,
}

impl ButtonFactory {
    pub fn new(dashboard_url: impl Into<String>) -> Self {
        Self {
            dashboard_url: dashboard_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn project_url(&self, project_id: &str) -> String {
        format!("{}/projects/{}", self.dashboard_url, project_id)
    }

    pub fn format_buttons(&self, kind: &ButtonKind) -> Vec<Button> {
        match kind {
            ButtonKind::Approval {
                artifact_id,
                project_id,
            } => vec![
                Button::callback("✅ Approve", CallbackData::new(Action::Approve, artifact_id)),
                Button::callback("✏️ Revise", CallbackData::new(Action::Reject, artifact_id)),
                Button::callback("👁 View", CallbackData::new(Action::View, project_id)),
            ],
            ButtonKind::Checkpoint { project_id } => vec![
                Button::callback("▶️ Continue", CallbackData::new(Action::Continue, project_id)),
                Button::callback("⏸ Pause", CallbackData::new(Action::Pause, project_id)),
                Button::callback("👁 View", CallbackData::new(Action::View, project_id)),
            ],
        }
    }

    pub fn orch_buttons(&self, project_id: &str, action: &OrchAction) -> Vec<Button> {
        match action {
            OrchAction::Launch(numbers) => {
                let label = numbers
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                vec![
                    Button::callback(
                        &format!("🚀 Launch tasks {}", label),
                        CallbackData::batch(project_id, numbers),
                    ),
                    Button::Link {
                        text: "📊 Dashboard".to_string(),
                        url: self.project_url(project_id),
                    },
                ]
            }
            OrchAction::Advance => vec![Button::callback(
                "⏭ Advance phase",
                CallbackData::new(Action::Advance, project_id),
            )],
            OrchAction::Progress => vec![Button::callback(
                "📊 Progress",
                CallbackData::new(Action::View, project_id),
            )],
            OrchAction::Complete => {
                let mut row = self.orch_buttons(project_id, &OrchAction::Advance);
                row.extend(self.orch_buttons(project_id, &OrchAction::Progress));
                row.push(Button::Link {
                    text: "📊 Dashboard".to_string(),
                    url: self.project_url(project_id),
                });
                row
            }
        }
    }
}
