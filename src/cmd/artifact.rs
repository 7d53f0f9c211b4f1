//! Artifact commands: `grid artifact ...`.

use anyhow::{Context, Result};

use grid::callback::ButtonKind;
use grid::gates::StateMachine;
use grid::models::{Artifact, ArtifactStatus};

use super::super::ArtifactCommands;
use super::{Runtime, print_buttons, print_json};

fn print_artifact(artifact: &Artifact) {
    println!(
        "{}  {:<6} {:<16} {}",
        artifact.id,
        artifact.artifact_type.as_str(),
        artifact.status.as_str(),
        artifact.file_path.as_deref().unwrap_or("-")
    );
    if let Some(feedback) = &artifact.feedback {
        println!("    feedback: {}", feedback);
    }
}

pub fn cmd_artifact(rt: &Runtime, command: ArtifactCommands) -> Result<()> {
    let store = rt.open_store()?;

    match command {
        ArtifactCommands::Add {
            project,
            artifact_type,
            file,
            content,
        } => {
            let (content, file_path) = match (file, content) {
                (Some(path), _) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    (text, Some(path.to_string_lossy().into_owned()))
                }
                (None, Some(text)) => (text, None),
                (None, None) => anyhow::bail!("Provide --file or --content"),
            };
            let artifact =
                store.create_artifact(&project, artifact_type, &content, file_path.as_deref())?;
            if rt.json {
                return print_json(&artifact);
            }
            println!("Added {} artifact {}", artifact.artifact_type.as_str(), artifact.id);
            print_buttons(&rt.buttons().format_buttons(&ButtonKind::Approval {
                artifact_id: artifact.id.clone(),
                project_id: project,
            }));
        }
        ArtifactCommands::List {
            project,
            artifact_type,
        } => {
            let artifacts = store.list_artifacts(&project, artifact_type)?;
            if rt.json {
                return print_json(&artifacts);
            }
            if artifacts.is_empty() {
                println!("No artifacts.");
            }
            for artifact in &artifacts {
                print_artifact(artifact);
            }
        }
        ArtifactCommands::Approve { id } => {
            let artifact =
                StateMachine::new(&store).review_artifact(&id, ArtifactStatus::Approved, None)?;
            if rt.json {
                return print_json(&artifact);
            }
            println!("{} artifact {} approved", artifact.artifact_type.as_str(), artifact.id);
        }
        ArtifactCommands::Reject { id, feedback } => {
            let artifact = StateMachine::new(&store).review_artifact(
                &id,
                ArtifactStatus::Rejected,
                Some(&feedback),
            )?;
            if rt.json {
                return print_json(&artifact);
            }
            println!("{} artifact {} rejected", artifact.artifact_type.as_str(), artifact.id);
        }
    }

    Ok(())
}
