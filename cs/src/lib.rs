//! CheckStore - checklist and ledger persistence for buildsweep
//!
//! The tracking state of a sweep lives in plain text files: one markdown
//! checklist per repository and per solution, plus CSV result ledgers. This
//! crate owns reading, writing, and mutating those files so the orchestration
//! layer never touches file formats directly.
//!
//! # Layout
//!
//! ```text
//! tasks/
//! ├── all_repository_checklist.md          # master list (excluded from discovery)
//! ├── {repo}_repo_checklist.md
//! └── {repo}_{solution}_solution_checklist.md
//! results/
//! ├── repo-results.csv
//! └── solution-results.csv                 # legacy: solution_result.csv
//! ```
//!
//! # Example
//!
//! ```ignore
//! use checkstore::{ChecklistKind, ChecklistStore, LedgerStore};
//!
//! let checklists = ChecklistStore::open("tasks")?;
//! let doc = checklists.load("tasks/acme_repo_checklist.md", ChecklistKind::Repo)?;
//! let ledger = LedgerStore::open("results")?;
//! let entries = ledger.read_repo_entries()?;
//! ```

pub mod checklist;
pub mod cli;
pub mod ledger;
pub mod section;
pub mod tasks;

pub use checklist::{ChecklistDoc, ChecklistKind, ChecklistStore, parse_checklist, slug_for};
pub use ledger::{LedgerEntry, LedgerStore, count_entries, has_find_solutions, solution_count};
pub use section::collect_section_lines;
pub use tasks::{TaskLine, classify_variables, extract_tasks, extract_variables, is_blank_value, parse_variable_line};

/// Filename suffix for repository checklists
pub const REPO_CHECKLIST_SUFFIX: &str = "_repo_checklist.md";

/// Filename suffix for solution checklists
pub const SOLUTION_CHECKLIST_SUFFIX: &str = "_solution_checklist.md";

/// Master checklist filename (never treated as a repository checklist)
pub const MASTER_CHECKLIST_NAME: &str = "all_repository_checklist.md";

/// Task reference recorded when solution discovery succeeds
pub const FIND_SOLUTIONS_TASK: &str = "task-find-solutions";
