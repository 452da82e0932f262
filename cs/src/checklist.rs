//! Checklist document store
//!
//! Loads, discovers, and mutates the per-repository and per-solution
//! checklist markdown files. Parsing is tolerant: a malformed document
//! produces empty task/variable lists rather than an error, and callers are
//! expected to treat "no mandatory tasks" as a failure of that entity.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use eyre::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::section::is_heading;
use crate::tasks::{TaskLine, extract_tasks, extract_variables};
use crate::{MASTER_CHECKLIST_NAME, REPO_CHECKLIST_SUFFIX, SOLUTION_CHECKLIST_SUFFIX};

static REPOSITORY_LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Repository:\s*(.+)$").expect("valid pattern"));

/// Which level of the tracking hierarchy a checklist belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistKind {
    Repo,
    Solution,
}

impl ChecklistKind {
    /// Infer the kind from a checklist filename
    pub fn infer(path: &Path) -> Self {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(SOLUTION_CHECKLIST_SUFFIX) {
            Self::Solution
        } else {
            Self::Repo
        }
    }

    /// Title line prefix for this kind
    pub fn title_prefix(&self) -> &'static str {
        match self {
            Self::Repo => "# Task Checklist:",
            Self::Solution => "# Solution Checklist:",
        }
    }

    /// Recognized tasks-section heading spellings, in priority order
    pub fn task_headings(&self) -> &'static [&'static str] {
        match self {
            Self::Repo => &["## Repo Tasks"],
            Self::Solution => &["## Solution Tasks", "### Tasks"],
        }
    }

    /// Recognized variables-section heading spellings
    pub fn variable_headings(&self) -> &'static [&'static str] {
        match self {
            Self::Repo => &["## Repo Variables Available", "## Task Variables"],
            Self::Solution => &[
                "## Solution Variables Available",
                "## Solution Variables",
                "### Solution Variables",
            ],
        }
    }

    /// Whether task extraction falls back to the relaxed checkbox pattern.
    ///
    /// Solution checklists have drifted through template revisions that
    /// dropped the [MANDATORY] tag, so any checkbox+reference line counts.
    pub fn relaxed_fallback(&self) -> bool {
        matches!(self, Self::Solution)
    }

    /// Filename suffix identifying this kind
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Repo => REPO_CHECKLIST_SUFFIX,
            Self::Solution => SOLUTION_CHECKLIST_SUFFIX,
        }
    }
}

/// A parsed checklist document
#[derive(Debug, Clone)]
pub struct ChecklistDoc {
    /// Path the document was loaded from
    pub path: PathBuf,

    /// Document kind
    pub kind: ChecklistKind,

    /// Entity name from the title line, if present
    pub title: Option<String>,

    /// Value of the `Repository:` metadata line, if present
    pub repository: Option<String>,

    /// Mandatory tasks in document order
    pub tasks: Vec<TaskLine>,

    /// Variable bindings in document order
    pub variables: Vec<(String, String)>,
}

impl ChecklistDoc {
    /// Name slug derived from the checklist filename
    pub fn slug(&self) -> String {
        slug_for(&self.path, self.kind)
    }

    /// References of all mandatory tasks
    pub fn task_references(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.reference.clone()).collect()
    }

    /// Count of tasks with the checkbox set
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.done).count()
    }
}

/// Derive the entity name slug from a checklist path
pub fn slug_for(path: &Path, kind: ChecklistKind) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.strip_suffix(kind.file_suffix())
        .map(str::to_string)
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        })
}

/// Store for the checklist files under a tasks directory
pub struct ChecklistStore {
    tasks_dir: PathBuf,
}

impl ChecklistStore {
    /// Open or create a checklist store at the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let tasks_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&tasks_dir).context("Failed to create tasks directory")?;
        debug!(?tasks_dir, "Opened checklist store");
        Ok(Self { tasks_dir })
    }

    /// Directory this store reads and writes
    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    /// Discover checklist files of the given kind, in name order.
    ///
    /// The master checklist is never returned.
    pub fn discover(&self, kind: ChecklistKind) -> Result<Vec<PathBuf>> {
        let pattern = self.tasks_dir.join(format!("*{}", kind.file_suffix()));
        let pattern = pattern.to_string_lossy().to_string();
        let mut paths: Vec<PathBuf> = glob::glob(&pattern)
            .context(format!("Invalid glob pattern: {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|p| {
                p.file_name().and_then(|n| n.to_str()).map(|n| n != MASTER_CHECKLIST_NAME).unwrap_or(false)
            })
            .collect();
        paths.sort();

        debug!(count = paths.len(), ?kind, "discover: found checklists");
        Ok(paths)
    }

    /// Load and parse a checklist document
    pub fn load(&self, path: impl AsRef<Path>, kind: ChecklistKind) -> Result<ChecklistDoc> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).context(format!("Failed to read checklist: {}", path.display()))?;
        Ok(parse_checklist(&content, path, kind))
    }

    /// Reset every `[x]` checkbox in the tasks section back to `[ ]`.
    ///
    /// Only lines inside the tasks section are touched; everything else is
    /// preserved byte-for-byte. Returns `Ok(false)` when the tasks section
    /// cannot be located; callers must treat that as a failed reset, since
    /// silently skipping it would leave stale done markers in place.
    pub fn reset_tasks(&self, path: impl AsRef<Path>, kind: ChecklistKind) -> Result<bool> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).context(format!("Failed to read checklist: {}", path.display()))?;
        let trailing_newline = content.ends_with('\n');

        let wanted: Vec<String> = kind.task_headings().iter().map(|h| h.to_lowercase()).collect();
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let mut in_section = false;
        let mut found = false;
        let mut flipped = 0usize;

        for line in lines.iter_mut() {
            let stripped = line.trim().to_string();
            if is_heading(&stripped) {
                let lower = stripped.to_lowercase();
                if !in_section && wanted.iter().any(|h| lower.starts_with(h.as_str())) {
                    in_section = true;
                    found = true;
                    continue;
                }
                if in_section {
                    break;
                }
            } else if in_section && line.contains("- [x]") {
                *line = line.replacen("- [x]", "- [ ]", 1);
                flipped += 1;
            }
        }

        if !found {
            warn!(path = %path.display(), "reset_tasks: tasks section not found");
            return Ok(false);
        }

        let mut new_content = lines.join("\n");
        if trailing_newline {
            new_content.push('\n');
        }
        fs::write(path, new_content).context(format!("Failed to write checklist: {}", path.display()))?;

        debug!(path = %path.display(), flipped, "reset_tasks: done");
        Ok(true)
    }
}

/// Parse checklist text into a document. Never fails: missing sections
/// simply yield empty task/variable lists.
pub fn parse_checklist(content: &str, path: &Path, kind: ChecklistKind) -> ChecklistDoc {
    let lines: Vec<&str> = content.lines().collect();

    let title = lines
        .iter()
        .find_map(|l| l.strip_prefix(kind.title_prefix()))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let repository = lines
        .iter()
        .find_map(|l| REPOSITORY_LINE_PATTERN.captures(l))
        .map(|caps| caps[1].trim().to_string())
        .filter(|r| !r.is_empty());

    let tasks = extract_tasks(&lines, kind.task_headings(), kind.relaxed_fallback());
    let variables = extract_variables(&lines, kind.variable_headings());

    ChecklistDoc {
        path: path.to_path_buf(),
        kind,
        title,
        repository,
        tasks,
        variables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const REPO_DOC: &str = "\
# Task Checklist: acme
Repository: https://example.com/org/acme
Generated: 2025-11-03T10:00:00Z

## Repo Tasks
- [x] (1) [MANDATORY] [SCRIPTABLE] Clone repository to local directory → @task-clone-repo
- [ ] (2) [MANDATORY] [SCRIPTABLE] Find all solution files in repository → @task-find-solutions

## Repo Variables Available
- {{repo_url}} → https://example.com/org/acme
- {{repo_name}} → acme
- {{clone_path}} →
";

    const SOLUTION_DOC: &str = "\
# Solution Checklist: Acme.Core
Repository: acme

### Tasks
- [x] Restore dependencies → @task-restore-solution
- [ ] Build solution → @task-build-solution

### Solution Variables
- {{solution_path}} → src/Acme.Core.sln
";

    #[test]
    fn test_parse_repo_checklist() {
        let doc = parse_checklist(REPO_DOC, Path::new("tasks/acme_repo_checklist.md"), ChecklistKind::Repo);

        assert_eq!(doc.title.as_deref(), Some("acme"));
        assert_eq!(doc.repository.as_deref(), Some("https://example.com/org/acme"));
        assert_eq!(doc.slug(), "acme");
        assert_eq!(doc.tasks.len(), 2);
        assert!(doc.tasks[0].done);
        assert!(!doc.tasks[1].done);
        assert_eq!(doc.completed_count(), 1);
        assert_eq!(doc.variables.len(), 3);
    }

    #[test]
    fn test_parse_solution_checklist_relaxed_tasks() {
        let doc = parse_checklist(
            SOLUTION_DOC,
            Path::new("tasks/acme_Acme_Core_solution_checklist.md"),
            ChecklistKind::Solution,
        );

        assert_eq!(doc.title.as_deref(), Some("Acme.Core"));
        assert_eq!(doc.repository.as_deref(), Some("acme"));
        assert_eq!(doc.slug(), "acme_Acme_Core");
        assert_eq!(doc.task_references(), vec!["task-restore-solution", "task-build-solution"]);
    }

    #[test]
    fn test_parse_malformed_document_yields_empty_maps() {
        let doc = parse_checklist("just some text\n", Path::new("tasks/x_repo_checklist.md"), ChecklistKind::Repo);

        assert!(doc.title.is_none());
        assert!(doc.tasks.is_empty());
        assert!(doc.variables.is_empty());
    }

    #[test]
    fn test_kind_infer_from_filename() {
        assert_eq!(
            ChecklistKind::infer(Path::new("tasks/a_repo_checklist.md")),
            ChecklistKind::Repo
        );
        assert_eq!(
            ChecklistKind::infer(Path::new("tasks/a_b_solution_checklist.md")),
            ChecklistKind::Solution
        );
    }

    #[test]
    fn test_discover_sorted_and_excludes_master() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path()).unwrap();
        fs::write(temp.path().join("zeta_repo_checklist.md"), "x").unwrap();
        fs::write(temp.path().join("acme_repo_checklist.md"), "x").unwrap();
        fs::write(temp.path().join(MASTER_CHECKLIST_NAME), "x").unwrap();
        fs::write(temp.path().join("acme_Acme_Core_solution_checklist.md"), "x").unwrap();

        let repos = store.discover(ChecklistKind::Repo).unwrap();
        let names: Vec<String> = repos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["acme_repo_checklist.md", "zeta_repo_checklist.md"]);

        let solutions = store.discover(ChecklistKind::Solution).unwrap();
        assert_eq!(solutions.len(), 1);
    }

    #[test]
    fn test_reset_tasks_flips_only_section_checkboxes() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path()).unwrap();
        let path = temp.path().join("acme_repo_checklist.md");
        let doc = "\
# Task Checklist: acme

## Repo Tasks
- [x] (1) [MANDATORY] Clone → @task-clone-repo
- [x] (2) [MANDATORY] Find solutions → @task-find-solutions

## For Agents Resuming Work
- [x] this checkbox lives outside the tasks section
";
        fs::write(&path, doc).unwrap();

        let ok = store.reset_tasks(&path, ChecklistKind::Repo).unwrap();
        assert!(ok);

        let after = fs::read_to_string(&path).unwrap();
        assert!(after.contains("- [ ] (1) [MANDATORY] Clone → @task-clone-repo"));
        assert!(after.contains("- [ ] (2) [MANDATORY] Find solutions → @task-find-solutions"));
        assert!(after.contains("- [x] this checkbox lives outside the tasks section"));
    }

    #[test]
    fn test_reset_tasks_missing_section_fails_loudly() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path()).unwrap();
        let path = temp.path().join("acme_repo_checklist.md");
        fs::write(&path, "# Task Checklist: acme\nno tasks here\n").unwrap();

        let ok = store.reset_tasks(&path, ChecklistKind::Repo).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_reset_tasks_preserves_unrelated_content() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path()).unwrap();
        let path = temp.path().join("s_solution_checklist.md");
        let doc = "\
# Solution Checklist: S
Repository: acme

### Tasks
- [x] Build → @task-build-solution

### Solution Variables
- {{solution_path}} → src/S.sln
";
        fs::write(&path, doc).unwrap();

        store.reset_tasks(&path, ChecklistKind::Solution).unwrap();

        let after = fs::read_to_string(&path).unwrap();
        assert!(after.contains("- [ ] Build → @task-build-solution"));
        assert!(after.contains("- {{solution_path}} → src/S.sln"));
        assert!(after.contains("Repository: acme"));
    }
}
