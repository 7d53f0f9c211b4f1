//! Project commands: `grid project ...`.

use anyhow::{Context, Result, bail};

use grid::errors::GridError;
use grid::gates::{AdvanceOutcome, GateDecision, StateMachine};
use grid::phase::Phase;

use super::super::ProjectCommands;
use super::{Runtime, print_buttons, print_json};

pub fn cmd_project(rt: &Runtime, command: ProjectCommands) -> Result<()> {
    let store = rt.open_store()?;

    match command {
        ProjectCommands::Create { name, repo } => {
            let repo = std::path::absolute(&repo)
                .with_context(|| format!("Failed to resolve {}", repo.display()))?;
            let project = store.create_project(&name, &repo.to_string_lossy())?;
            if rt.json {
                return print_json(&project);
            }
            println!(
                "Created project {} ({})",
                console::style(&project.name).bold(),
                project.id
            );
            println!("Phase: {}", project.phase);
        }
        ProjectCommands::List => {
            let projects = store.list_projects()?;
            if rt.json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                println!("No projects. Create one with 'grid project create <name> --repo <path>'.");
                return Ok(());
            }
            for project in &projects {
                println!(
                    "{}  {:<24} {:<10} {}",
                    project.id,
                    project.name,
                    project.phase,
                    project.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ProjectCommands::Show { id } => {
            let project = store
                .get_project(&id)?
                .ok_or(GridError::ProjectNotFound { id: id.clone() })?;
            let gate = StateMachine::new(&store).check_gate(&id)?;
            let orch = rt.orchestrator(&store);
            let progress = orch.progress(&id)?;

            if rt.json {
                return print_json(&serde_json::json!({
                    "project": project,
                    "gate_open": gate.is_open(),
                    "progress": progress,
                }));
            }

            println!();
            println!("{}", console::style(&project.name).bold());
            println!("  id:      {}", project.id);
            println!("  repo:    {}", project.repo_path);
            println!("  phase:   {}", project.phase);
            match &gate {
                GateDecision::Open => {
                    println!("  gate:    {}", console::style("open").green())
                }
                GateDecision::Blocked(reason) => {
                    println!("  gate:    {} ({})", console::style("blocked").yellow(), reason)
                }
            }
            if progress.total > 0 {
                println!("  tasks:   {}", orch.progress_message(&id)?);
            }
            println!();
        }
        ProjectCommands::Model { id, phase } => {
            let phases: Vec<Phase> = match phase {
                Some(p) => vec![p],
                None => Phase::ALL.to_vec(),
            };
            let mut rows = Vec::new();
            for phase in phases {
                let model = store
                    .get_model_for_phase(&id, phase)?
                    .ok_or(GridError::ProjectNotFound { id: id.clone() })?;
                rows.push((phase, model));
            }
            if rt.json {
                let map: std::collections::BTreeMap<_, _> = rows.into_iter().collect();
                return print_json(&map);
            }
            for (phase, model) in rows {
                println!("{:<11} {}", phase, model);
            }
        }
        ProjectCommands::SetModel { id, phase, model } => {
            let project = store
                .get_project(&id)?
                .ok_or(GridError::ProjectNotFound { id: id.clone() })?;
            let mut config = project.model_config.unwrap_or_default();
            config.insert(phase, model.clone());
            store.set_model_config(&id, &config)?;
            if rt.json {
                return print_json(&config);
            }
            println!("{} now uses {}", phase, model);
        }
        ProjectCommands::Advance { id } => {
            let outcome = StateMachine::new(&store).advance(&id)?;
            if rt.json {
                print_json(&outcome)?;
            }
            match outcome {
                AdvanceOutcome::Advanced { from, to } => {
                    if !rt.json {
                        println!("Advanced {} → {}", from, to);
                        if to == Phase::Done {
                            println!("Project complete.");
                        } else {
                            print_buttons(&rt.buttons().format_buttons(
                                &grid::callback::ButtonKind::Checkpoint { project_id: id },
                            ));
                        }
                    }
                }
                AdvanceOutcome::Rejected { reason } => bail!("Advance rejected: {}", reason),
            }
        }
    }

    Ok(())
}
