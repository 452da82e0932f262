//! Repository checklist format pre-check
//!
//! Runs once after generation, before the first pass. A freshly generated
//! checklist only carries the variables section; the task-variables section
//! appears when the first task executes, so only the absence of BOTH
//! variables sections is a failure.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use checkstore::{ChecklistKind, ChecklistStore, slug_for};

/// Result of the format pre-check across all repository checklists
#[derive(Debug, Clone, Serialize)]
pub struct FormatReport {
    pub total_checklists: usize,
    pub passed: usize,
    pub failed: usize,
    pub issues: Vec<String>,
    pub overall_status: String,
    pub timestamp: String,
}

impl FormatReport {
    /// True when every checklist passed
    pub fn all_passed(&self) -> bool {
        self.overall_status == "PASS"
    }

    /// Write the JSON and markdown artifacts for human inspection
    pub fn write(&self, output_dir: &Path, results_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;
        std::fs::create_dir_all(results_dir)?;

        let json_path = output_dir.join("verify-repo-checklist-format.json");
        std::fs::write(&json_path, serde_json::to_string_pretty(self)?)
            .context(format!("Failed to write format report: {}", json_path.display()))?;

        let mut md = String::new();
        md.push_str("# Repository Checklist Format Verification\n\n");
        md.push_str(&format!("Generated: {}\n\n", self.timestamp));
        md.push_str("## Summary\n\n");
        md.push_str(&format!("- Total Checklists: {}\n", self.total_checklists));
        md.push_str(&format!("- Passed: {}\n", self.passed));
        md.push_str(&format!("- Failed: {}\n", self.failed));
        md.push_str(&format!("- Overall Status: {}\n\n", self.overall_status));
        if !self.issues.is_empty() {
            md.push_str("## Issues Found\n\n");
            for issue in &self.issues {
                md.push_str(&format!("- {}\n", issue));
            }
        }
        let md_path = results_dir.join("repo-checklist-format-verification.md");
        std::fs::write(&md_path, md)
            .context(format!("Failed to write format report: {}", md_path.display()))?;

        Ok(())
    }
}

/// Check every repository checklist for the required structure: the title
/// header, a tasks section heading, and at least one variables section
/// heading. Finding zero checklists is itself a failure.
pub fn verify_repo_checklist_format(checklists: &ChecklistStore) -> Result<FormatReport> {
    let paths = checklists.discover(ChecklistKind::Repo)?;
    let mut issues = Vec::new();

    if paths.is_empty() {
        warn!("verify_repo_checklist_format: no repository checklist files found");
        issues.push("No repository checklist files found".to_string());
    }

    for path in &paths {
        let repo_name = slug_for(path, ChecklistKind::Repo);
        debug!(repo = %repo_name, "verify_repo_checklist_format: checking");

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                issues.push(format!("{}: unreadable checklist ({})", repo_name, e));
                continue;
            }
        };

        if content.trim().is_empty() {
            issues.push(format!("{}: File is empty", repo_name));
            continue;
        }

        let first_line = content.lines().next().unwrap_or_default();
        if !first_line.trim().starts_with("# Task Checklist:") {
            issues.push(format!("{}: Missing or incorrect header", repo_name));
        }

        let has_repo_tasks = content.lines().any(|l| l.contains("## Repo Tasks"));
        let has_task_variables = content.lines().any(|l| l.contains("## Task Variables"));
        let has_repo_variables = content.lines().any(|l| l.contains("## Repo Variables Available"));

        if !has_repo_tasks {
            issues.push(format!("{}: Missing '## Repo Tasks' section", repo_name));
        }
        if !has_task_variables && !has_repo_variables {
            issues.push(format!(
                "{}: Missing both '## Task Variables' and '## Repo Variables Available' sections",
                repo_name
            ));
        }
    }

    let failed = issues.len();
    let all_passed = failed == 0 && !paths.is_empty();
    Ok(FormatReport {
        total_checklists: paths.len(),
        passed: paths.len().saturating_sub(failed),
        failed,
        issues,
        overall_status: if all_passed { "PASS" } else { "FAIL" }.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}
