//! `grid.toml` configuration.
//!
//! Settings are layered: the TOML file (`.grid/grid.toml` by default), then
//! `GRID_*` environment variables, then CLI flags applied by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::orchestrator::DEFAULT_BATCH_SIZE;

pub const CONFIG_DIR: &str = ".grid";
pub const CONFIG_FILE: &str = "grid.toml";
pub const DEFAULT_DB_FILE: &str = "grid.db";
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:3000";

pub const ENV_DB_PATH: &str = "GRID_DB_PATH";
pub const ENV_BATCH_SIZE: &str = "GRID_BATCH_SIZE";
pub const ENV_DASHBOARD_URL: &str = "GRID_DASHBOARD_URL";
pub const ENV_LOG: &str = "GRID_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Database file; relative paths resolve against the project directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSection {
    #[serde(default = "default_dashboard_url")]
    pub url: String,
}

fn default_dashboard_url() -> String {
    DEFAULT_DASHBOARD_URL.to_string()
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            url: default_dashboard_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines on stderr instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Also write daily-rotated log files here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            dir: None,
        }
    }
}

/// The complete grid.toml configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub dashboard: DashboardSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GridConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse grid.toml")
    }

    /// The config file in effect: `explicit` when given, else
    /// `<project_dir>/.grid/grid.toml`.
    pub fn config_path(project_dir: &Path, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => project_dir.join(CONFIG_DIR).join(CONFIG_FILE),
        }
    }

    /// Load `<grid_dir>/grid.toml`, or defaults when it does not exist.
    pub fn load_or_default(grid_dir: &Path) -> Result<Self> {
        let config_path = grid_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize grid.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// File (explicit path, else the project default) then process environment.
    pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(&project_dir.join(CONFIG_DIR))?,
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `GRID_*` overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            self.orchestrator.batch_size = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} '{}'", ENV_BATCH_SIZE, raw))?;
        }
        if let Some(url) = lookup(ENV_DASHBOARD_URL) {
            self.dashboard.url = url;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        Ok(self)
    }

    /// Database location for a project directory.
    pub fn db_path(&self, project_dir: &Path) -> PathBuf {
        match &self.store.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => project_dir.join(path),
            None => project_dir.join(CONFIG_DIR).join(DEFAULT_DB_FILE),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.orchestrator.batch_size == 0 {
            warnings.push("orchestrator.batch_size is 0; batches of 1 will be used".to_string());
        }
        if !(self.dashboard.url.starts_with("http://") || self.dashboard.url.starts_with("https://"))
        {
            warnings.push(format!(
                "dashboard.url '{}' is not an http(s) URL",
                self.dashboard.url
            ));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.filter).is_err() {
            warnings.push(format!(
                "logging.filter '{}' is not a valid filter directive",
                self.logging.filter
            ));
        }

        warnings
    }
}
