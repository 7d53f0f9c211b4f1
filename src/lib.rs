pub mod callback;
pub mod config;
pub mod db;
pub mod errors;
pub mod gates;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod phase;
pub mod plan;
pub mod tracker;

pub use db::Store;
pub use errors::{GridError, WorktreeError};
pub use gates::{AdvanceOutcome, StateMachine};
pub use orchestrator::{Orchestrator, Recommendation};
pub use phase::Phase;
