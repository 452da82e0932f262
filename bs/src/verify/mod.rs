//! Verification of checklists against the result ledgers
//!
//! A task only counts when its checkbox is done AND exactly one ledger row
//! corroborates it. Verification is read-only and batched: one ledger read
//! covers a whole pass, so every entity is judged against the same snapshot.

mod format;
mod repo;
mod report;
mod solution;

pub use format::{FormatReport, verify_repo_checklist_format};
pub use repo::RepoVerifier;
pub use report::{write_repo_verification_report, write_solution_verification_report};
pub use solution::{SolutionVerifier, alias_set, resolve_parent};

use checkstore::{LedgerEntry, TaskLine, count_entries};

/// Variables that may stay blank even when their producing task is mandatory
pub const OPTIONAL_VARIABLES: &[&str] = &["executed_commands", "skipped_commands"];

/// Reason recorded when a checklist yields no mandatory tasks at all.
///
/// Guards against treating a malformed or empty checklist as trivially
/// satisfied: an entity with zero discoverable tasks can never be complete.
pub const NO_MANDATORY_TASKS: &str = "NO_MANDATORY_TASKS_DETECTED";

/// Build unmet reasons for a task list against a ledger snapshot.
///
/// A pending checkbox is "incomplete"; a done checkbox must have exactly one
/// matching row; zero and duplicates are reported as distinct reasons so an
/// operator can tell "never ran" from "ledger corruption".
pub(crate) fn task_reasons(
    tasks: &[TaskLine],
    entries: &[LedgerEntry],
    repo: &str,
    solution_aliases: Option<&[String]>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    for task in tasks {
        if !task.done {
            reasons.push(format!("incomplete: {}", task.reference));
            continue;
        }
        match count_entries(entries, repo, solution_aliases, &task.reference) {
            1 => {}
            0 => reasons.push(format!("no ledger entry recorded for {}", task.reference)),
            n => reasons.push(format!("duplicate ledger entries ({}) for {}", n, task.reference)),
        }
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(repo: &str, task: &str) -> LedgerEntry {
        LedgerEntry {
            repo: repo.to_string(),
            solution: None,
            task: task.to_string(),
            status: "SUCCESS".to_string(),
            timestamp: None,
            source: "repo-results.csv".to_string(),
        }
    }

    fn task(reference: &str, done: bool) -> TaskLine {
        TaskLine {
            reference: reference.to_string(),
            done,
        }
    }

    #[test]
    fn test_task_reasons_distinguish_zero_and_duplicate() {
        let tasks = vec![
            task("task-clone-repo", true),
            task("task-find-solutions", true),
            task("task-search-readme", true),
            task("task-scan-readme", false),
        ];
        let entries = vec![
            entry("acme", "task-clone-repo"),
            entry("acme", "task-find-solutions"),
            entry("acme", "task-find-solutions"),
        ];

        let reasons = task_reasons(&tasks, &entries, "acme", None);

        assert_eq!(
            reasons,
            vec![
                "duplicate ledger entries (2) for task-find-solutions",
                "no ledger entry recorded for task-search-readme",
                "incomplete: task-scan-readme",
            ]
        );
    }

    #[test]
    fn test_task_reasons_empty_when_satisfied() {
        let tasks = vec![task("task-clone-repo", true)];
        let entries = vec![entry("acme", "task-clone-repo")];

        assert!(task_reasons(&tasks, &entries, "acme", None).is_empty());
    }
}
