//! Workflow phase definition for the grid engine.
//!
//! This module provides:
//! - `Phase`, the six ordered workflow stages a project moves through
//! - Ordering helpers (`next`, `index`, `is_terminal`)
//! - The static per-phase default model table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six ordered workflow stages.
///
/// Projects start in `Brainstorm` and move forward exactly one step per
/// successful advance. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Brainstorm,
    Design,
    Plan,
    Execute,
    Review,
    Done,
}

impl Phase {
    /// All phases in workflow order.
    pub const ALL: [Phase; 6] = [
        Phase::Brainstorm,
        Phase::Design,
        Phase::Plan,
        Phase::Execute,
        Phase::Review,
        Phase::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brainstorm => "brainstorm",
            Self::Design => "design",
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    /// Zero-based position in the workflow order.
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|p| p == self)
            .unwrap_or_default()
    }

    /// The phase that follows this one, or `None` for `Done`.
    pub fn next(&self) -> Option<Phase> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::Done
    }

    /// Model used for this phase when a project has no override.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Brainstorm | Self::Design | Self::Review => "opus",
            Self::Plan | Self::Execute => "sonnet",
            Self::Done => "haiku",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "brainstorm" => Ok(Self::Brainstorm),
            "design" => Ok(Self::Design),
            "plan" => Ok(Self::Plan),
            "execute" => Ok(Self::Execute),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            _ => Err(format!(
                "Invalid phase '{}'. Valid values: brainstorm, design, plan, execute, review, done",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_is_linear() {
        let mut phase = Phase::Brainstorm;
        let mut visited = vec![phase];
        while let Some(next) = phase.next() {
            assert_eq!(next.index(), phase.index() + 1);
            phase = next;
            visited.push(phase);
        }
        assert_eq!(visited, Phase::ALL.to_vec());
        assert_eq!(phase, Phase::Done);
    }

    #[test]
    fn test_done_is_terminal() {
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Done.next().is_none());
        assert!(!Phase::Review.is_terminal());
    }

    #[test]
    fn test_phase_round_trips_through_str() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        assert_eq!("EXECUTE".parse::<Phase>().unwrap(), Phase::Execute);
    }

    #[test]
    fn test_phase_from_str_rejects_unknown() {
        let err = "deploy".parse::<Phase>().unwrap_err();
        assert!(err.contains("deploy"));
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::Brainstorm).unwrap();
        assert_eq!(json, "\"brainstorm\"");
    }

    #[test]
    fn test_default_models_cover_every_phase() {
        assert_eq!(Phase::Brainstorm.default_model(), "opus");
        assert_eq!(Phase::Execute.default_model(), "sonnet");
        assert_eq!(Phase::Done.default_model(), "haiku");
    }
}
