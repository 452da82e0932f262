//! Consolidated run summary
//!
//! One JSON document is emitted per orchestrator invocation so a human can
//! diagnose a run without reading raw logs: every entity with its terminal
//! state, per-attempt detail, and the specific unmet reasons for anything
//! left unresolved.

use std::path::{Path, PathBuf};

use colored::*;
use eyre::{Context, Result};
use serde::Serialize;
use tracing::debug;

use super::{AttemptRecord, EntityState};

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Success,
    PartialSuccess,
    Fail,
}

/// Which level of the hierarchy an unresolved failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Repository,
    Solution,
}

/// Final record for one repository
#[derive(Debug, Clone, Serialize)]
pub struct RepoDetail {
    pub repo_name: String,
    pub checklist_path: PathBuf,
    pub final_state: EntityState,
    pub attempts: Vec<AttemptRecord>,
}

/// Final record for one solution
#[derive(Debug, Clone, Serialize)]
pub struct SolutionDetail {
    pub solution_name: String,
    pub display_name: Option<String>,
    pub parent_repo: Option<String>,
    pub checklist_path: PathBuf,
    pub final_state: EntityState,
    pub attempts: Vec<AttemptRecord>,
}

/// One entity left unresolved after all passes
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedFailure {
    pub kind: EntityKind,
    pub name: String,
    pub reasons: Vec<String>,
}

/// The consolidated run summary
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub run_id: String,
    pub append_mode: bool,
    pub workflow_status: WorkflowStatus,
    pub error_message: Option<String>,

    pub total_repositories: usize,
    pub processed_repositories: usize,
    pub successful_repositories: usize,
    pub failed_repositories: usize,
    pub repository_details: Vec<RepoDetail>,

    pub total_solutions: usize,
    pub processed_solutions: usize,
    pub successful_solutions: usize,
    pub failed_solutions: usize,
    pub solution_details: Vec<SolutionDetail>,

    pub unresolved_failures: Vec<UnresolvedFailure>,

    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
}

/// Output filename for the consolidated summary
pub const SUMMARY_FILENAME: &str = "orchestrate-workflow.json";

impl WorkflowSummary {
    /// True when no entity ended in a terminal failure and no bootstrap
    /// error occurred
    pub fn fully_successful(&self) -> bool {
        self.workflow_status == WorkflowStatus::Success
    }

    /// Write the summary JSON into the output directory
    pub fn write_json(&self, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;
        let path = output_dir.join(SUMMARY_FILENAME);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content).context(format!("Failed to write summary: {}", path.display()))?;
        debug!(path = %path.display(), "write_json: summary written");
        Ok(path)
    }

    /// Print a human-readable recap to stdout
    pub fn print_console(&self) {
        let status = match self.workflow_status {
            WorkflowStatus::Success => "SUCCESS".green().bold(),
            WorkflowStatus::PartialSuccess => "PARTIAL_SUCCESS".yellow().bold(),
            WorkflowStatus::Fail => "FAIL".red().bold(),
        };
        println!("Workflow status: {}", status);
        println!(
            "Repositories: {} total, {} processed, {} passed, {} failed",
            self.total_repositories,
            self.processed_repositories,
            self.successful_repositories.to_string().green(),
            self.failed_repositories.to_string().red(),
        );
        println!(
            "Solutions:    {} total, {} processed, {} passed, {} failed",
            self.total_solutions,
            self.processed_solutions,
            self.successful_solutions.to_string().green(),
            self.failed_solutions.to_string().red(),
        );
        if let Some(message) = &self.error_message {
            println!("Error: {}", message.red());
        }
        for failure in &self.unresolved_failures {
            let kind = match failure.kind {
                EntityKind::Repository => "repo",
                EntityKind::Solution => "solution",
            };
            println!("  {} {} [{}]", "\u{2717}".red(), failure.name, kind);
            for reason in &failure.reasons {
                println!("      - {}", reason.dimmed());
            }
        }
        println!("Duration: {:.2}s", self.duration_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_summary() -> WorkflowSummary {
        WorkflowSummary {
            run_id: "run-1".to_string(),
            append_mode: false,
            workflow_status: WorkflowStatus::Fail,
            error_message: None,
            total_repositories: 2,
            processed_repositories: 2,
            successful_repositories: 1,
            failed_repositories: 1,
            repository_details: vec![],
            total_solutions: 0,
            processed_solutions: 0,
            successful_solutions: 0,
            failed_solutions: 0,
            solution_details: vec![],
            unresolved_failures: vec![UnresolvedFailure {
                kind: EntityKind::Repository,
                name: "zeta".to_string(),
                reasons: vec!["incomplete: task-clone-repo".to_string()],
            }],
            start_time: "2025-11-03T10:00:00Z".to_string(),
            end_time: "2025-11-03T10:05:00Z".to_string(),
            duration_seconds: 300.0,
        }
    }

    #[test]
    fn test_write_json_creates_file() {
        let temp = tempdir().unwrap();
        let summary = sample_summary();

        let path = summary.write_json(temp.path()).unwrap();
        assert!(path.ends_with(SUMMARY_FILENAME));

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["workflow_status"], "FAIL");
        assert_eq!(value["unresolved_failures"][0]["kind"], "repository");
        assert_eq!(value["unresolved_failures"][0]["name"], "zeta");
    }

    #[test]
    fn test_fully_successful_only_on_success() {
        let mut summary = sample_summary();
        assert!(!summary.fully_successful());

        summary.workflow_status = WorkflowStatus::PartialSuccess;
        assert!(!summary.fully_successful());

        summary.workflow_status = WorkflowStatus::Success;
        assert!(summary.fully_successful());
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&WorkflowStatus::PartialSuccess).unwrap();
        assert_eq!(json, "\"PARTIAL_SUCCESS\"");
    }
}
