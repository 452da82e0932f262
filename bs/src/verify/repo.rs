//! Repository checklist verification

use std::path::PathBuf;

use eyre::Result;
use tracing::{debug, warn};

use checkstore::{ChecklistKind, ChecklistStore, LedgerStore, classify_variables, slug_for};

use crate::domain::VerificationResult;

use super::{NO_MANDATORY_TASKS, OPTIONAL_VARIABLES, task_reasons};

/// Classifies repository checklists as satisfied or produces their unmet
/// reasons. Read-only: one ledger read covers the whole batch.
pub struct RepoVerifier<'a> {
    checklists: &'a ChecklistStore,
    ledger: &'a LedgerStore,
}

impl<'a> RepoVerifier<'a> {
    /// Create a verifier over the given stores
    pub fn new(checklists: &'a ChecklistStore, ledger: &'a LedgerStore) -> Self {
        Self { checklists, ledger }
    }

    /// Verify every discovered repository checklist
    pub fn verify_all(&self) -> Result<Vec<VerificationResult>> {
        let paths = self.checklists.discover(ChecklistKind::Repo)?;
        self.verify(&paths)
    }

    /// Verify the given checklists, preserving input order
    pub fn verify(&self, paths: &[PathBuf]) -> Result<Vec<VerificationResult>> {
        let entries = self.ledger.read_repo_entries()?;
        debug!(checklist_count = paths.len(), ledger_rows = entries.len(), "verify: starting batch");

        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            let repo_name = slug_for(path, ChecklistKind::Repo);

            let doc = match self.checklists.load(path, ChecklistKind::Repo) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "verify: unable to read checklist");
                    results.push(VerificationResult {
                        entity: repo_name,
                        checklist_path: path.clone(),
                        unmet_reasons: vec!["failed to read checklist file".to_string()],
                        mandatory_total: 0,
                        mandatory_completed: 0,
                    });
                    continue;
                }
            };

            let mut unmet_reasons = Vec::new();

            if doc.tasks.is_empty() {
                unmet_reasons.push(NO_MANDATORY_TASKS.to_string());
            } else {
                unmet_reasons.extend(task_reasons(&doc.tasks, &entries, &repo_name, None));

                let (missing_vars, _verified) = classify_variables(&doc.variables, OPTIONAL_VARIABLES);
                for name in missing_vars {
                    unmet_reasons.push(format!("variable not populated: {}", name));
                }
            }

            debug!(repo = %repo_name, unmet = unmet_reasons.len(), "verify: repo checked");
            results.push(VerificationResult {
                entity: repo_name,
                checklist_path: path.clone(),
                unmet_reasons,
                mandatory_total: doc.tasks.len(),
                mandatory_completed: doc.completed_count(),
            });
        }

        Ok(results)
    }
}
