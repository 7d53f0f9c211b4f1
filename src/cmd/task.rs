//! Task and batch commands: `grid task ...`.

use anyhow::{Result, bail};

use grid::callback::OrchAction;
use grid::errors::GridError;
use grid::models::{Task, TaskStatus};
use grid::orchestrator::Recommendation;
use grid::plan::parse_plan_file;

use super::super::TaskCommands;
use super::{Runtime, print_buttons, print_json};

fn print_task(task: &Task) {
    println!(
        "{:>3}. {:<12} {}",
        task.task_number,
        task.status.as_str(),
        task.title
    );
    for review in [&task.spec_review, &task.quality_review].into_iter().flatten() {
        println!("       {}", console::style(review).dim());
    }
}

pub fn cmd_task(rt: &Runtime, command: TaskCommands) -> Result<()> {
    let store = rt.open_store()?;
    let orch = rt.orchestrator(&store);

    match command {
        TaskCommands::Parse {
            project,
            file,
            artifact,
        } => {
            let parsed = parse_plan_file(&file)?;
            if parsed.is_empty() {
                bail!(
                    "No '### Task <N>: <Title>' headings found in {}",
                    file.display()
                );
            }
            let new_tasks: Vec<_> = parsed
                .into_iter()
                .map(|t| t.into_new_task(artifact.as_deref()))
                .collect();
            let created = store.create_task_batch(&project, &new_tasks)?;
            if rt.json {
                return print_json(&created);
            }
            println!("Created {} tasks from {}", created.len(), file.display());
        }
        TaskCommands::List { project } => {
            let tasks = store.list_tasks(&project)?;
            if rt.json {
                return print_json(&tasks);
            }
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in &tasks {
                print_task(task);
            }
        }
        TaskCommands::Batch {
            project,
            size,
            start,
        } => {
            let Some(batch) = orch.next_batch(&project, size)? else {
                if rt.json {
                    return print_json(&serde_json::Value::Null);
                }
                println!("No batch available: a batch is running or nothing is pending.");
                return Ok(());
            };
            let numbers = batch.task_numbers();
            if start {
                orch.start_batch(&project, &numbers)?;
            }
            if rt.json {
                return print_json(&batch);
            }
            println!(
                "{} tasks {:?}",
                if start { "Started" } else { "Next batch:" },
                numbers
            );
            for task in &batch.tasks {
                println!("  {}. {}", task.task_number, task.title);
            }
            if !start {
                print_buttons(&rt.buttons().orch_buttons(&project, &OrchAction::Launch(numbers)));
            }
        }
        TaskCommands::Complete {
            project,
            number,
            verdict,
            note,
        } => {
            let task = orch.complete_task(&project, number, verdict, &note)?;
            if rt.json {
                return print_json(&task);
            }
            print_task(&task);
        }
        TaskCommands::Status { project } => {
            let recommendation = orch.status(&project)?;
            if rt.json {
                return print_json(&recommendation);
            }
            println!("{}", orch.progress_message(&project)?);
            match recommendation {
                Recommendation::SpawnBatch { batch, buttons } => {
                    println!("Ready to launch tasks {:?}", batch.task_numbers());
                    print_buttons(&buttons);
                }
                Recommendation::Waiting { in_progress } => {
                    println!("Waiting on tasks {:?}", in_progress);
                }
                Recommendation::AllDone { buttons } => {
                    println!("All tasks approved.");
                    print_buttons(&buttons);
                }
                Recommendation::Stalled { failed } => {
                    if failed.is_empty() {
                        println!("No tasks yet. Run 'grid task parse' on an approved plan.");
                    } else {
                        println!(
                            "Stalled: tasks {:?} need attention ('grid task set-status').",
                            failed
                        );
                    }
                }
            }
        }
        TaskCommands::SetStatus {
            project,
            number,
            status,
        } => {
            let task = store
                .get_task_by_number(&project, number)?
                .ok_or(GridError::TaskNotFound {
                    project_id: project.clone(),
                    task_number: number,
                })?;
            let updated = match status {
                TaskStatus::Approved => store.approve_task(&task.id)?,
                TaskStatus::InProgress => store.start_task(&task.id)?,
                other => store.update_task_status(&task.id, other)?,
            };
            let updated = updated.ok_or(GridError::TaskNotFound {
                project_id: project,
                task_number: number,
            })?;
            if rt.json {
                return print_json(&updated);
            }
            print_task(&updated);
        }
    }

    Ok(())
}
