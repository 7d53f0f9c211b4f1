//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module     | Commands handled      |
//! |------------|-----------------------|
//! | `project`  | `Project`             |
//! | `artifact` | `Artifact`            |
//! | `task`     | `Task`                |
//! | `worktree` | `Worktree`            |
//! | `events`   | `Events`, `Callback`  |
//! | `config`   | `Config`              |

pub mod artifact;
pub mod config;
pub mod events;
pub mod project;
pub mod task;
pub mod worktree;

pub use artifact::cmd_artifact;
pub use config::cmd_config;
pub use events::{cmd_callback, cmd_events};
pub use project::cmd_project;
pub use task::cmd_task;
pub use worktree::cmd_worktree;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use grid::callback::{Button, ButtonFactory};
use grid::config::GridConfig;
use grid::db::Store;
use grid::orchestrator::Orchestrator;

/// Resolved settings shared by every command.
pub struct Runtime {
    pub project_dir: PathBuf,
    /// Config file in effect, whether or not it exists.
    pub config_path: PathBuf,
    pub config: GridConfig,
    pub json: bool,
}

impl Runtime {
    pub fn db_path(&self) -> PathBuf {
        self.config.db_path(&self.project_dir)
    }

    pub fn open_store(&self) -> Result<Store> {
        Store::open(&self.db_path())
    }

    pub fn buttons(&self) -> ButtonFactory {
        ButtonFactory::new(self.config.dashboard.url.clone())
    }

    pub fn orchestrator<'a>(&self, store: &'a Store) -> Orchestrator<'a> {
        Orchestrator::new(store, self.config.orchestrator.batch_size, self.buttons())
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

pub fn print_buttons(buttons: &[Button]) {
    for button in buttons {
        match button {
            Button::Callback {
                text,
                callback_data,
            } => println!("  [{}] {}", text, console::style(callback_data).dim()),
            Button::Link { text, url } => println!("  [{}] {}", text, console::style(url).underlined()),
        }
    }
}
