//! Integration tests for the grid CLI
//!
//! These tests drive the binary end to end against a temporary database.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a grid Command rooted in `dir`, isolated from the caller's env
fn grid(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("grid");
    cmd.current_dir(dir.path())
        .env_remove("GRID_DB_PATH")
        .env_remove("GRID_BATCH_SIZE")
        .env_remove("GRID_DASHBOARD_URL")
        .env_remove("GRID_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Run with `--json` and parse stdout
fn grid_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = grid(dir).arg("--json").args(args).output().unwrap();
    assert!(
        output.status.success(),
        "grid {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn create_project(dir: &TempDir, name: &str) -> String {
    let repo = dir.path().join("repo");
    fs::create_dir_all(&repo).unwrap();
    let project = grid_json(
        dir,
        &["project", "create", name, "--repo", repo.to_str().unwrap()],
    );
    project["id"].as_str().unwrap().to_string()
}

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_grid_help() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("project"));
    }

    #[test]
    fn test_grid_version() {
        let dir = TempDir::new().unwrap();
        grid(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_default_database_location() {
        let dir = TempDir::new().unwrap();
        create_project(&dir, "alpha");
        assert!(dir.path().join(".grid/grid.db").exists());
    }

    #[test]
    fn test_db_flag_overrides_location() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("custom/state.db");
        grid(&dir)
            .args(["--db", db.to_str().unwrap(), "project", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No projects"));
        assert!(db.exists());
    }
}

// =============================================================================
// Project Tests
// =============================================================================

mod projects {
    use super::*;

    #[test]
    fn test_create_and_list() {
        let dir = TempDir::new().unwrap();
        create_project(&dir, "alpha");
        grid(&dir)
            .args(["project", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("alpha").and(predicate::str::contains("brainstorm")));
    }

    #[test]
    fn test_show_unknown_project_fails() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .args(["project", "show", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Project nope not found"));
    }

    #[test]
    fn test_advance_without_design_is_rejected() {
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");
        grid(&dir)
            .args(["project", "advance", &id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Advance rejected"));

        grid(&dir)
            .args(["project", "show", &id])
            .assert()
            .success()
            .stdout(predicate::str::contains("blocked"));
    }

    #[test]
    fn test_models_default_and_override() {
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");

        let models = grid_json(&dir, &["project", "model", &id]);
        assert_eq!(models["execute"], "sonnet");
        assert_eq!(models["brainstorm"], "opus");

        grid(&dir)
            .args(["project", "set-model", &id, "execute", "opus"])
            .assert()
            .success();
        grid(&dir)
            .args(["project", "model", &id, "--phase", "execute"])
            .assert()
            .success()
            .stdout(predicate::str::contains("opus"));
    }

    #[test]
    fn test_invalid_phase_argument() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .args(["project", "set-model", "x", "deploy", "opus"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid phase"));
    }
}

// =============================================================================
// Artifact and Phase Flow Tests
// =============================================================================

mod artifacts {
    use super::*;

    #[test]
    fn test_design_approval_opens_gate() {
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");

        let artifact = grid_json(
            &dir,
            &["artifact", "add", &id, "--type", "design", "--content", "# Design"],
        );
        assert_eq!(artifact["status"], "draft");
        let artifact_id = artifact["id"].as_str().unwrap();

        grid(&dir)
            .args(["artifact", "approve", artifact_id])
            .assert()
            .success()
            .stdout(predicate::str::contains("approved"));

        let outcome = grid_json(&dir, &["project", "advance", &id]);
        assert_eq!(outcome["outcome"], "advanced");
        assert_eq!(outcome["to"], "design");

        let outcome = grid_json(&dir, &["project", "advance", &id]);
        assert_eq!(outcome["to"], "plan");

        let events = grid_json(&dir, &["events", &id]);
        let kinds: Vec<&str> = events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["event_type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["phase_change", "phase_change", "approval"]);
    }

    #[test]
    fn test_add_from_file_records_path_and_prints_buttons() {
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");
        fs::write(dir.path().join("plan.md"), "### Task 1: One\n").unwrap();

        grid(&dir)
            .args(["artifact", "add", &id, "--type", "plan", "--file", "plan.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("grid:approve:"));

        let artifacts = grid_json(&dir, &["artifact", "list", &id, "--type", "plan"]);
        assert_eq!(artifacts[0]["file_path"], "plan.md");
        assert_eq!(artifacts[0]["content"], "### Task 1: One\n");
    }

    #[test]
    fn test_add_requires_content_or_file() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .args(["artifact", "add", "p", "--type", "design"])
            .assert()
            .failure();
    }

    #[test]
    fn test_reject_records_feedback() {
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");
        let artifact = grid_json(
            &dir,
            &["artifact", "add", &id, "--type", "design", "--content", "x"],
        );
        let rejected = grid_json(
            &dir,
            &[
                "artifact",
                "reject",
                artifact["id"].as_str().unwrap(),
                "--feedback",
                "needs detail",
            ],
        );
        assert_eq!(rejected["status"], "rejected");
        assert_eq!(rejected["feedback"], "needs detail");
    }
}

// =============================================================================
// Task Tests
// =============================================================================

mod tasks {
    use super::*;

    const PLAN: &str = "\
# Plan

```markdown
### Task 1: Example only
```

### Task 1: Schema
Create the tables.

### Task 2: Store
Write the store.

### Task 3: CLI
Wire the commands.

### Task 4: Docs
Write docs.
";

    fn project_with_tasks(dir: &TempDir) -> String {
        let id = create_project(dir, "alpha");
        fs::write(dir.path().join("plan.md"), PLAN).unwrap();
        grid(dir)
            .args(["task", "parse", &id, "plan.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created 4 tasks"));
        id
    }

    #[test]
    fn test_parse_skips_fenced_examples() {
        let dir = TempDir::new().unwrap();
        let id = project_with_tasks(&dir);
        let tasks = grid_json(&dir, &["task", "list", &id]);
        let titles: Vec<&str> = tasks
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Schema", "Store", "CLI", "Docs"]);
        assert_eq!(tasks[0]["description"], "Create the tables.");
    }

    #[test]
    fn test_parse_plan_without_tasks_fails() {
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");
        fs::write(dir.path().join("empty.md"), "# Nothing here\n").unwrap();
        grid(&dir)
            .args(["task", "parse", &id, "empty.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No '### Task"));
    }

    #[test]
    fn test_batch_waves() {
        let dir = TempDir::new().unwrap();
        let id = project_with_tasks(&dir);

        let batch = grid_json(&dir, &["task", "batch", &id, "--start"]);
        let numbers: Vec<i64> = batch["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["task_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(batch["parallel"], true);

        // Nothing new while the wave runs
        assert_eq!(grid_json(&dir, &["task", "batch", &id]), Value::Null);
        let status = grid_json(&dir, &["task", "status", &id]);
        assert_eq!(status["action"], "waiting");

        for n in ["1", "2", "3"] {
            grid(&dir)
                .args(["task", "complete", &id, n, "pass", "--note", "ok"])
                .assert()
                .success();
        }

        let status = grid_json(&dir, &["task", "status", &id]);
        assert_eq!(status["action"], "spawn_batch");
        assert_eq!(status["batch"]["tasks"][0]["task_number"], 4);
        assert_eq!(status["buttons"][0]["callback_data"], format!("grid:batch:{}:4", id));
    }

    #[test]
    fn test_batch_size_from_environment() {
        let dir = TempDir::new().unwrap();
        let id = project_with_tasks(&dir);
        let output = grid(&dir)
            .env("GRID_BATCH_SIZE", "2")
            .args(["--json", "task", "batch", &id])
            .output()
            .unwrap();
        let batch: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(batch["tasks"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_complete_fail_and_manual_fix() {
        let dir = TempDir::new().unwrap();
        let id = project_with_tasks(&dir);

        let failed = grid_json(&dir, &["task", "complete", &id, "2", "fail", "--note", "no tests"]);
        assert_eq!(failed["status"], "failed");
        assert!(failed["completed_at"].is_null());
        assert!(failed["spec_review"].as_str().unwrap().contains("FAIL"));

        let fixed = grid_json(&dir, &["task", "set-status", &id, "2", "in-progress"]);
        assert_eq!(fixed["status"], "in_progress");
    }

    #[test]
    fn test_complete_unknown_task_fails() {
        let dir = TempDir::new().unwrap();
        let id = project_with_tasks(&dir);
        grid(&dir)
            .args(["task", "complete", &id, "99", "pass"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Task 99 not found"));
    }

    #[test]
    fn test_status_shows_progress_glyphs() {
        let dir = TempDir::new().unwrap();
        let id = project_with_tasks(&dir);
        grid(&dir)
            .args(["task", "complete", &id, "1", "pass"])
            .assert()
            .success();
        grid(&dir)
            .args(["task", "status", &id])
            .assert()
            .success()
            .stdout(predicate::str::contains("🟢⚪⚪⚪ 1/4 done"));
    }
}

// =============================================================================
// Callback and Config Tests
// =============================================================================

mod callbacks_and_config {
    use super::*;

    #[test]
    fn test_callback_decodes_batch() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .args(["callback", "grid:batch:proj-123:1,2,3"])
            .assert()
            .success()
            .stdout(predicate::str::contains("proj-123").and(predicate::str::contains("[1, 2, 3]")));
    }

    #[test]
    fn test_callback_rejects_unknown_action() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .args(["callback", "grid:unknown:id"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid callback token"));
    }

    #[test]
    fn test_config_init_show_validate() {
        let dir = TempDir::new().unwrap();
        grid(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote default config"));
        assert!(dir.path().join(".grid/grid.toml").exists());

        grid(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("batch_size = 3"));

        grid(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));
    }

    #[test]
    fn test_explicit_config_path_is_shown_and_initialized() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("conf/custom.toml");
        let custom_arg = custom.to_str().unwrap();

        grid(&dir)
            .args(["--config", custom_arg, "config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains(custom_arg));
        assert!(custom.exists());
        assert!(!dir.path().join(".grid/grid.toml").exists());

        fs::write(&custom, "[orchestrator]\nbatch_size = 7\n").unwrap();
        grid(&dir)
            .args(["--config", custom_arg, "config", "show"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains(format!("Config file: {}", custom_arg))
                    .and(predicate::str::contains("batch_size = 7"))
                    .and(predicate::str::contains("none, using defaults").not()),
            );
    }

    #[test]
    fn test_environment_beats_config_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".grid")).unwrap();
        fs::write(
            dir.path().join(".grid/grid.toml"),
            "[dashboard]\nurl = \"http://file:1\"\n",
        )
        .unwrap();

        let output = grid(&dir)
            .env("GRID_DASHBOARD_URL", "http://env:2")
            .args(["--json", "config", "show"])
            .output()
            .unwrap();
        let config: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(config["dashboard"]["url"], "http://env:2");
    }
}

// =============================================================================
// Worktree Tests (need a git binary)
// =============================================================================

mod worktrees {
    use super::*;

    #[test]
    fn test_worktree_create_list_remove() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let id = create_project(&dir, "alpha");
        let repo = dir.path().join("repo");
        git(&repo, &["init", "-q"]);
        git(&repo, &["config", "user.email", "test@test.com"]);
        git(&repo, &["config", "user.name", "test"]);
        fs::write(repo.join("README.md"), "hi\n").unwrap();
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-q", "-m", "init"]);

        let worktree = grid_json(&dir, &["worktree", "create", &id, "feature/cli"]);
        let path = worktree["path"].as_str().unwrap().to_string();
        assert!(path.ends_with(".worktrees/feature-cli"));
        assert!(Path::new(&path).join("README.md").exists());

        let entries = grid_json(&dir, &["worktree", "list", &id, "--git"]);
        assert_eq!(entries.as_array().unwrap().len(), 2);

        grid(&dir)
            .args(["worktree", "remove", worktree["id"].as_str().unwrap(), "--merged"])
            .assert()
            .success()
            .stdout(predicate::str::contains("merged"));
        assert!(!Path::new(&path).exists());

        let recorded = grid_json(&dir, &["worktree", "list", &id]);
        assert_eq!(recorded[0]["status"], "merged");
    }
}
