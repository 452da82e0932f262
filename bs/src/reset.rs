//! Reset/purge between passes
//!
//! Before an incomplete entity is retried, its checklist checkboxes flip
//! back to pending and its ledger rows are deleted, so the re-run cannot
//! inherit stale done markers or accumulate duplicate rows next to fresh
//! ones. Failures here are reported as `false`, never raised, so the
//! orchestrator can count the entity as unretryable and move on to its
//! siblings.

use std::path::Path;

use tracing::{debug, warn};

use checkstore::{ChecklistKind, ChecklistStore, LedgerStore};

use crate::verify::alias_set;

/// Reverts checklist and ledger state for entities about to be retried
pub struct ResetOperator<'a> {
    checklists: &'a ChecklistStore,
    ledger: &'a LedgerStore,
}

impl<'a> ResetOperator<'a> {
    /// Create an operator over the given stores
    pub fn new(checklists: &'a ChecklistStore, ledger: &'a LedgerStore) -> Self {
        Self { checklists, ledger }
    }

    /// Reset a repository checklist and purge its ledger rows.
    ///
    /// Returns `false` when any step fails; a silent no-op would let the
    /// retry loop "succeed" forever without changing state.
    pub fn reset_repo(&self, repo_name: &str, checklist_path: &Path) -> bool {
        let doc = match self.checklists.load(checklist_path, ChecklistKind::Repo) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(repo = %repo_name, error = %e, "reset_repo: unable to read checklist");
                return false;
            }
        };

        let task_refs = doc.task_references();
        match self.ledger.purge_repo_rows(repo_name, &task_refs) {
            Ok(removed) => debug!(repo = %repo_name, removed, "reset_repo: purged ledger rows"),
            Err(e) => {
                warn!(repo = %repo_name, error = %e, "reset_repo: ledger purge failed");
                return false;
            }
        }

        match self.checklists.reset_tasks(checklist_path, ChecklistKind::Repo) {
            Ok(true) => {
                debug!(repo = %repo_name, "reset_repo: checkboxes reset");
                true
            }
            Ok(false) => {
                warn!(repo = %repo_name, "reset_repo: tasks section not found");
                false
            }
            Err(e) => {
                warn!(repo = %repo_name, error = %e, "reset_repo: checklist reset failed");
                false
            }
        }
    }

    /// Reset a solution checklist and purge its ledger rows across the
    /// solution's alias set.
    pub fn reset_solution(
        &self,
        parent_repo: &str,
        slug: &str,
        display_name: Option<&str>,
        checklist_path: &Path,
    ) -> bool {
        let doc = match self.checklists.load(checklist_path, ChecklistKind::Solution) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(solution = %slug, error = %e, "reset_solution: unable to read checklist");
                return false;
            }
        };

        let task_refs = doc.task_references();
        let aliases = alias_set(slug, display_name);
        match self.ledger.purge_solution_rows(parent_repo, &aliases, &task_refs) {
            Ok(removed) => debug!(solution = %slug, removed, "reset_solution: purged ledger rows"),
            Err(e) => {
                warn!(solution = %slug, error = %e, "reset_solution: ledger purge failed");
                return false;
            }
        }

        match self.checklists.reset_tasks(checklist_path, ChecklistKind::Solution) {
            Ok(true) => {
                debug!(solution = %slug, "reset_solution: checkboxes reset");
                true
            }
            Ok(false) => {
                warn!(solution = %slug, "reset_solution: tasks section not found");
                false
            }
            Err(e) => {
                warn!(solution = %slug, error = %e, "reset_solution: checklist reset failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::RepoVerifier;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct Fixture {
        _temp: tempfile::TempDir,
        checklists: ChecklistStore,
        ledger: LedgerStore,
    }

    fn fixture() -> Fixture {
        let temp = tempdir().unwrap();
        let checklists = ChecklistStore::open(temp.path().join("tasks")).unwrap();
        let ledger = LedgerStore::open(temp.path().join("results")).unwrap();
        Fixture {
            _temp: temp,
            checklists,
            ledger,
        }
    }

    fn write_completed_repo(fixture: &Fixture, repo: &str) -> PathBuf {
        let path = fixture.checklists.tasks_dir().join(format!("{}_repo_checklist.md", repo));
        let doc = format!(
            "# Task Checklist: {repo}\n\n\
             ## Repo Tasks\n\
             - [x] (1) [MANDATORY] Clone \u{2192} @task-clone-repo\n\
             - [x] (2) [MANDATORY] Find solutions \u{2192} @task-find-solutions\n\n\
             ## Repo Variables Available\n\
             - {{{{repo_name}}}} \u{2192} {repo}\n",
            repo = repo,
        );
        fs::write(&path, doc).unwrap();
        fixture.ledger.append_repo(repo, "task-clone-repo", "SUCCESS").unwrap();
        fixture.ledger.append_repo(repo, "task-find-solutions", "1 solutions").unwrap();
        path
    }

    #[test]
    fn test_reset_repo_reverts_checkboxes_and_purges_rows() {
        let fixture = fixture();
        let path = write_completed_repo(&fixture, "acme");

        let operator = ResetOperator::new(&fixture.checklists, &fixture.ledger);
        assert!(operator.reset_repo("acme", &path));

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("- [x]"));

        let entries = fixture.ledger.read_repo_entries().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_reset_repo_leaves_sibling_rows_alone() {
        let fixture = fixture();
        let acme = write_completed_repo(&fixture, "acme");
        let _zeta = write_completed_repo(&fixture, "zeta");

        let operator = ResetOperator::new(&fixture.checklists, &fixture.ledger);
        assert!(operator.reset_repo("acme", &acme));

        let entries = fixture.ledger.read_repo_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.repo == "zeta"));
    }

    #[test]
    fn test_verifier_reports_unmet_immediately_after_reset() {
        let fixture = fixture();
        let path = write_completed_repo(&fixture, "acme");

        let operator = ResetOperator::new(&fixture.checklists, &fixture.ledger);
        assert!(operator.reset_repo("acme", &path));

        let verifier = RepoVerifier::new(&fixture.checklists, &fixture.ledger);
        let results = verifier.verify(std::slice::from_ref(&path)).unwrap();
        assert!(!results[0].is_satisfied());
        assert!(results[0].unmet_reasons.iter().all(|r| r.starts_with("incomplete:")));
    }

    #[test]
    fn test_reset_repo_fails_loudly_without_tasks_section() {
        let fixture = fixture();
        let path = fixture.checklists.tasks_dir().join("bad_repo_checklist.md");
        fs::write(&path, "# Task Checklist: bad\nno section here\n").unwrap();

        let operator = ResetOperator::new(&fixture.checklists, &fixture.ledger);
        assert!(!operator.reset_repo("bad", &path));
    }

    #[test]
    fn test_reset_repo_fails_on_missing_file() {
        let fixture = fixture();
        let operator = ResetOperator::new(&fixture.checklists, &fixture.ledger);

        assert!(!operator.reset_repo("ghost", &fixture.checklists.tasks_dir().join("ghost_repo_checklist.md")));
    }

    #[test]
    fn test_reset_solution_purges_alias_spellings() {
        let fixture = fixture();
        let path = fixture
            .checklists
            .tasks_dir()
            .join("myrepo_My_Solution_solution_checklist.md");
        let doc = "\
# Solution Checklist: My.Solution
Repository: myrepo

### Tasks
- [x] [MANDATORY] Build \u{2192} @task-build-solution
";
        fs::write(&path, doc).unwrap();
        // Row recorded under the space-separated display spelling.
        fixture
            .ledger
            .append_solution("myrepo", "My Solution", "task-build-solution", "SUCCESS")
            .unwrap();

        let operator = ResetOperator::new(&fixture.checklists, &fixture.ledger);
        assert!(operator.reset_solution("myrepo", "myrepo_My_Solution", Some("My.Solution"), &path));

        let entries = fixture.ledger.read_solution_entries().unwrap();
        assert!(entries.is_empty());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("- [ ] [MANDATORY] Build"));
    }
}
