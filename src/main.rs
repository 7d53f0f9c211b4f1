use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use grid::models::{ArtifactType, TaskStatus, Verdict};
use grid::phase::Phase;

mod cmd;

#[derive(Parser)]
#[command(name = "grid")]
#[command(version, about = "Phase-gated development workflow engine")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database file (overrides grid.toml and GRID_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to .grid/grid.toml under the project directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, inspect and advance projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage design and plan artifacts
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
    /// Parse plans into tasks and run task batches
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage git worktrees for a project
    Worktree {
        #[command(subcommand)]
        command: WorktreeCommands,
    },
    /// Show a project's event log, newest first
    Events {
        project: String,
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Decode a callback token
    Callback { raw: String },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    Create {
        name: String,
        /// Repository the project works in
        #[arg(long)]
        repo: PathBuf,
    },
    List,
    Show {
        id: String,
    },
    /// Show the model used per phase
    Model {
        id: String,
        #[arg(long)]
        phase: Option<Phase>,
    },
    SetModel {
        id: String,
        phase: Phase,
        model: String,
    },
    /// Move to the next phase if the current gate passes
    Advance {
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ArtifactCommands {
    Add {
        project: String,
        #[arg(long = "type")]
        artifact_type: ArtifactType,
        #[arg(long, conflicts_with = "content", required_unless_present = "content")]
        file: Option<PathBuf>,
        #[arg(long)]
        content: Option<String>,
    },
    List {
        project: String,
        #[arg(long = "type")]
        artifact_type: Option<ArtifactType>,
    },
    Approve {
        id: String,
    },
    Reject {
        id: String,
        #[arg(long)]
        feedback: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum TaskCommands {
    /// Create tasks from a plan markdown file
    Parse {
        project: String,
        file: PathBuf,
        /// Plan artifact the tasks come from
        #[arg(long)]
        artifact: Option<String>,
    },
    List {
        project: String,
    },
    /// Show (and optionally start) the next batch
    Batch {
        project: String,
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        start: bool,
    },
    /// Record a review verdict for a task
    Complete {
        project: String,
        number: i64,
        verdict: Verdict,
        #[arg(long, default_value = "")]
        note: String,
    },
    Status {
        project: String,
    },
    /// Manually correct a task's status
    SetStatus {
        project: String,
        number: i64,
        status: TaskStatus,
    },
}

#[derive(Subcommand, Clone)]
pub enum WorktreeCommands {
    Create {
        project: String,
        branch: String,
    },
    List {
        project: String,
        /// List what git reports instead of recorded worktrees
        #[arg(long)]
        git: bool,
    },
    Remove {
        id: String,
        /// Record as merged instead of discarded
        #[arg(long)]
        merged: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    Show,
    Validate,
    Init,
}

fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // `config init --config <path>` creates the file it names
    let creating = matches!(
        cli.command,
        Commands::Config {
            command: Some(ConfigCommands::Init)
        }
    );
    let explicit = cli
        .config
        .as_deref()
        .filter(|path| !creating || path.exists());
    let mut config = grid::config::GridConfig::resolve(&project_dir, explicit)?;
    if let Some(db) = &cli.db {
        config.store.path = Some(db.clone());
    }

    let _log_guard = grid::logging::init(cli.verbose, &config.logging)?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let config_path = grid::config::GridConfig::config_path(&project_dir, cli.config.as_deref());
    let runtime = cmd::Runtime {
        project_dir,
        config_path,
        config,
        json: cli.json,
    };

    match cli.command {
        Commands::Config { command } => cmd::cmd_config(&runtime, command)?,
        Commands::Callback { raw } => cmd::cmd_callback(&runtime, &raw)?,
        Commands::Project { command } => cmd::cmd_project(&runtime, command)?,
        Commands::Artifact { command } => cmd::cmd_artifact(&runtime, command)?,
        Commands::Task { command } => cmd::cmd_task(&runtime, command)?,
        Commands::Worktree { command } => cmd::cmd_worktree(&runtime, command)?,
        Commands::Events { project, limit } => cmd::cmd_events(&runtime, &project, limit)?,
    }

    Ok(())
}
