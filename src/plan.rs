//! Fence-aware extraction of tasks from plan markdown.
//!
//! A task is a level-3 heading of the form `### Task <N>: <Title>`. Headings
//! inside triple-backtick fences are documentation examples and are ignored.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::NewTask;

static TASK_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^### Task (\d+):[ \t]*(.+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTask {
    pub task_number: i64,
    pub title: String,
    pub description: String,
}

impl PlanTask {
    /// Convert into store input, linked to the plan artifact it came from.
    pub fn into_new_task(self, artifact_id: Option<&str>) -> NewTask {
        NewTask {
            task_number: self.task_number,
            title: self.title,
            description: self.description,
            artifact_id: artifact_id.map(str::to_string),
            worktree_id: None,
        }
    }
}

/// Byte ranges covered by fenced code blocks, fence lines included.
/// An unclosed fence runs to the end of the document.
fn fenced_ranges(markdown: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;
    let mut offset = 0;

    for line in markdown.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            match open.take() {
                Some(start) => ranges.push(start..offset + line.len()),
                None => open = Some(offset),
            }
        }
        offset += line.len();
    }
    if let Some(start) = open {
        ranges.push(start..markdown.len());
    }
    ranges
}

/// Extract every real task heading with the text that follows it.
///
/// Never fails: a document with no headings yields an empty list.
pub fn parse_plan(markdown: &str) -> Vec<PlanTask> {
    let fences = fenced_ranges(markdown);
    let in_fence = |pos: usize| fences.iter().any(|r| r.contains(&pos));

    // (task_number, title, heading start, heading line end)
    let headings: Vec<(i64, String, usize, usize)> = TASK_HEADING
        .captures_iter(markdown)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            if in_fence(whole.start()) {
                return None;
            }
            let number = cap[1].parse::<i64>().ok()?;
            let title = cap[2].trim().to_string();
            Some((number, title, whole.start(), whole.end()))
        })
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(i, (number, title, _, line_end))| {
            let body_end = headings
                .get(i + 1)
                .map(|(_, _, next_start, _)| *next_start)
                .unwrap_or(markdown.len());
            PlanTask {
                task_number: *number,
                title: title.clone(),
                description: markdown[*line_end..body_end].trim().to_string(),
            }
        })
        .collect()
}

/// Read and parse a plan file.
pub fn parse_plan_file(path: &Path) -> Result<Vec<PlanTask>> {
    let markdown = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    let tasks = parse_plan(&markdown);
    if tasks.is_empty() && !markdown.trim().is_empty() {
        tracing::warn!(
            file = %path.display(),
            "plan contains no '### Task <N>: <Title>' headings outside code fences"
        );
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_simple_plan() {
        let md = "# Plan\n\n### Task 1: Schema\nCreate tables.\n\n### Task 2: API\nAdd routes.\nWith tests.\n";
        let tasks = parse_plan(md);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_number, 1);
        assert_eq!(tasks[0].title, "Schema");
        assert_eq!(tasks[0].description, "Create tables.");
        assert_eq!(tasks[1].title, "API");
        assert_eq!(tasks[1].description, "Add routes.\nWith tests.");
    }

    #[test]
    fn test_header_only_plan_yields_nothing() {
        assert!(parse_plan("# Implementation Plan\n\nSome intro text.\n").is_empty());
        assert!(parse_plan("").is_empty());
    }

    #[test]
    fn test_headings_inside_fences_are_ignored() {
        let md = "\
Write tasks like this:

```markdown
### Task 1: Example
Example body.
### Task 2: Another example
```

### Task 1: Real work
Do the real thing.
";
        let tasks = parse_plan(md);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_number, 1);
        assert_eq!(tasks[0].title, "Real work");
        assert_eq!(tasks[0].description, "Do the real thing.");
    }

    #[test]
    fn test_fenced_example_between_real_tasks_stays_in_description() {
        let md = "\
### Task 1: Docs
Document the format:
```
### Task 9: Not real
```
### Task 2: Code
Implement it.
";
        let tasks = parse_plan(md);
        let numbers: Vec<i64> = tasks.iter().map(|t| t.task_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(tasks[0].description.contains("### Task 9: Not real"));
        assert_eq!(tasks[1].description, "Implement it.");
    }

    #[test]
    fn test_unclosed_fence_hides_rest_of_document() {
        let md = "### Task 1: Before\nbody\n```\n### Task 2: Swallowed\n";
        let tasks = parse_plan(md);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Before");
    }

    #[test]
    fn test_heading_must_match_exact_shape() {
        let md = "## Task 1: Wrong level\n### Task two: Not a number\n####  Task 3: Deep\n### Task 4: Right\n";
        let tasks = parse_plan(md);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_number, 4);
    }

    #[test]
    fn test_crlf_titles_are_trimmed() {
        let tasks = parse_plan("### Task 1: Windows\r\nbody\r\n");
        assert_eq!(tasks[0].title, "Windows");
        assert_eq!(tasks[0].description, "body");
    }

    #[test]
    fn test_into_new_task_links_artifact() {
        let task = parse_plan("### Task 5: Link\nx").remove(0);
        let new = task.into_new_task(Some("artifact-1"));
        assert_eq!(new.task_number, 5);
        assert_eq!(new.artifact_id.as_deref(), Some("artifact-1"));
        assert!(new.worktree_id.is_none());
    }

    #[test]
    fn test_parse_plan_file_reads_and_reports_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.md");
        std::fs::write(&path, "### Task 1: From disk\nbody\n").unwrap();
        assert_eq!(parse_plan_file(&path).unwrap().len(), 1);

        let err = parse_plan_file(&dir.path().join("missing.md")).unwrap_err();
        assert!(err.to_string().contains("Failed to read plan"));
    }
}
