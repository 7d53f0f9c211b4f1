//! Configuration view and validation commands: `grid config`.

use anyhow::{Context, Result};

use grid::config::GridConfig;

use super::super::ConfigCommands;
use super::{Runtime, print_json};

pub fn cmd_config(rt: &Runtime, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &rt.config_path;

    match command {
        None | Some(ConfigCommands::Show) => {
            if rt.json {
                return print_json(&rt.config);
            }
            println!();
            println!("Grid Configuration");
            println!("==================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("Config file: (none, using defaults)");
            }
            println!("Database:    {}", rt.db_path().display());
            println!();
            let rendered =
                toml::to_string_pretty(&rt.config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Some(ConfigCommands::Validate) => {
            let warnings = rt.config.validate();
            if warnings.is_empty() {
                println!("{} Configuration is valid", console::style("✓").green());
            } else {
                for warning in &warnings {
                    println!("{} {}", console::style("⚠").yellow(), warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                return Ok(());
            }
            if let Some(dir) = config_path.parent()
                && !dir.as_os_str().is_empty()
            {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            GridConfig::default().save(config_path)?;
            println!("Wrote default config to {}", config_path.display());
        }
    }

    Ok(())
}
