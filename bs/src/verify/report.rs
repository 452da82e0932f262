//! Verification report artifacts
//!
//! JSON and markdown dumps of a verification pass for human inspection.
//! These are informational only and never feed back into control flow.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use eyre::{Context, Result};
use serde::Serialize;

use crate::domain::VerificationResult;

#[derive(Debug, Serialize)]
struct EntityDetail<'a> {
    name: &'a str,
    checklist_path: String,
    total_tasks: usize,
    completed_tasks: usize,
    unmet_reasons: &'a [String],
    all_completed: bool,
}

#[derive(Debug, Serialize)]
struct VerificationReport<'a> {
    total: usize,
    passing: usize,
    failing: usize,
    details: Vec<EntityDetail<'a>>,
    overall_status: &'a str,
    timestamp: String,
}

fn build_report<'a>(results: &'a [VerificationResult]) -> VerificationReport<'a> {
    let passing = results.iter().filter(|r| r.is_satisfied()).count();
    let failing = results.len() - passing;
    VerificationReport {
        total: results.len(),
        passing,
        failing,
        details: results
            .iter()
            .map(|r| EntityDetail {
                name: &r.entity,
                checklist_path: r.checklist_path.display().to_string(),
                total_tasks: r.mandatory_total,
                completed_tasks: r.mandatory_completed,
                unmet_reasons: &r.unmet_reasons,
                all_completed: r.is_satisfied(),
            })
            .collect(),
        overall_status: if failing == 0 { "PASS" } else { "FAIL" },
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

fn render_markdown(title: &str, report: &VerificationReport<'_>) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", title));
    md.push_str(&format!("Generated: {}\n\n", report.timestamp));
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Total: {}\n", report.total));
    md.push_str(&format!("- Passing: {}\n", report.passing));
    md.push_str(&format!("- Failing: {}\n", report.failing));
    md.push_str(&format!("- Overall Status: {}\n\n", report.overall_status));

    for detail in &report.details {
        md.push_str(&format!("### {}\n\n", detail.name));
        md.push_str(&format!("- Total Tasks: {}\n", detail.total_tasks));
        md.push_str(&format!("- Completed: {}\n", detail.completed_tasks));
        md.push_str(&format!("- Status: {}\n", if detail.all_completed { "PASS" } else { "FAIL" }));
        if !detail.unmet_reasons.is_empty() {
            md.push_str("- Unmet:\n");
            for reason in detail.unmet_reasons {
                md.push_str(&format!("  - {}\n", reason));
            }
        }
        md.push('\n');
    }
    md
}

fn write_report(
    results: &[VerificationResult],
    output_dir: &Path,
    results_dir: &Path,
    json_name: &str,
    md_name: &str,
    title: &str,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    std::fs::create_dir_all(results_dir)?;

    let report = build_report(results);

    let json_path = output_dir.join(json_name);
    std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)
        .context(format!("Failed to write report: {}", json_path.display()))?;

    let md_path = results_dir.join(md_name);
    std::fs::write(&md_path, render_markdown(title, &report))
        .context(format!("Failed to write report: {}", md_path.display()))?;

    Ok(())
}

/// Write the repository verification report artifacts
pub fn write_repo_verification_report(
    results: &[VerificationResult],
    output_dir: &Path,
    results_dir: &Path,
) -> Result<()> {
    write_report(
        results,
        output_dir,
        results_dir,
        "verify-repo-tasks-completed.json",
        "repo-tasks-verification.md",
        "Repository Tasks Verification",
    )
}

/// Write the solution verification report artifacts
pub fn write_solution_verification_report(
    results: &[VerificationResult],
    output_dir: &Path,
    results_dir: &Path,
) -> Result<()> {
    write_report(
        results,
        output_dir,
        results_dir,
        "verify-solution-tasks-completed.json",
        "solution-tasks-verification.md",
        "Solution Tasks Verification",
    )
}
