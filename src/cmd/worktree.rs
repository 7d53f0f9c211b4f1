//! Worktree commands: `grid worktree ...`.

use std::path::Path;

use anyhow::Result;

use grid::errors::GridError;
use grid::models::WorktreeStatus;
use grid::tracker::{WorktreeManager, provision, release};

use super::super::WorktreeCommands;
use super::{Runtime, print_json};

fn manager_for(store: &grid::Store, project_id: &str) -> Result<WorktreeManager> {
    let project = store
        .get_project(project_id)?
        .ok_or(GridError::ProjectNotFound {
            id: project_id.to_string(),
        })?;
    Ok(WorktreeManager::open(Path::new(&project.repo_path))?)
}

pub fn cmd_worktree(rt: &Runtime, command: WorktreeCommands) -> Result<()> {
    let store = rt.open_store()?;

    match command {
        WorktreeCommands::Create { project, branch } => {
            let manager = manager_for(&store, &project)?;
            let worktree = provision(&store, &manager, &project, &branch)?;
            if rt.json {
                return print_json(&worktree);
            }
            println!("Created worktree {} at {}", worktree.id, worktree.path);
        }
        WorktreeCommands::List { project, git } => {
            if git {
                let entries = manager_for(&store, &project)?.list()?;
                if rt.json {
                    return print_json(&entries);
                }
                for entry in &entries {
                    let label = match (&entry.branch, entry.detached, entry.bare) {
                        (_, _, true) => "(bare)".to_string(),
                        (Some(branch), _, _) => branch.clone(),
                        (None, true, _) => "(detached)".to_string(),
                        (None, false, _) => "-".to_string(),
                    };
                    println!("{}  {}", entry.path.display(), label);
                }
                return Ok(());
            }

            let worktrees = store.list_worktrees(&project)?;
            if rt.json {
                return print_json(&worktrees);
            }
            if worktrees.is_empty() {
                println!("No worktrees.");
            }
            for wt in &worktrees {
                println!("{}  {:<10} {:<24} {}", wt.id, wt.status.as_str(), wt.branch, wt.path);
            }
        }
        WorktreeCommands::Remove { id, merged } => {
            let worktree = store
                .get_worktree(&id)?
                .ok_or(GridError::WorktreeNotFound { id: id.clone() })?;
            let manager = manager_for(&store, &worktree.project_id)?;
            let status = if merged {
                WorktreeStatus::Merged
            } else {
                WorktreeStatus::Discarded
            };
            let released = release(&store, &manager, &id, status)?;
            if rt.json {
                return print_json(&released);
            }
            println!("Removed worktree {} ({})", released.path, released.status.as_str());
        }
    }

    Ok(())
}
