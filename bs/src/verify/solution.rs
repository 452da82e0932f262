//! Solution checklist verification
//!
//! Solutions carry two names: the sanitized slug from the checklist filename
//! and the display name from the original solution-path stem. Ledger rows
//! may record either spelling (or an underscore/space/dot variant), so
//! matching goes through an explicit alias set. Parent repositories resolve
//! from the `Repository:` metadata line first, then by prefix-matching the
//! slug against known repository names.

use std::path::PathBuf;

use eyre::Result;
use tracing::{debug, warn};

use checkstore::{ChecklistKind, ChecklistStore, LedgerStore, classify_variables, slug_for};

use crate::domain::{SolutionInfo, VerificationResult};

use super::{NO_MANDATORY_TASKS, task_reasons};

/// Compute the accepted ledger spellings for a solution.
///
/// Candidates: the slug itself; the slug minus its repository prefix (text
/// after the first underscore), plus that suffix with underscores replaced
/// by spaces and by dots; the display name and the same two replacements.
/// Comparison against ledger rows is case-insensitive.
pub fn alias_set(slug: &str, display_name: Option<&str>) -> Vec<String> {
    let mut aliases: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        let trimmed = candidate.trim().to_string();
        if !trimmed.is_empty() && !aliases.iter().any(|a| *a == trimmed) {
            aliases.push(trimmed);
        }
    };

    push(slug.to_string());
    if let Some((_, suffix)) = slug.split_once('_') {
        push(suffix.to_string());
        push(suffix.replace('_', " "));
        push(suffix.replace('_', "."));
    }
    if let Some(display) = display_name {
        push(display.to_string());
        push(display.replace('_', " "));
        push(display.replace('_', "."));
    }

    aliases
}

/// Resolve a solution's parent repository.
///
/// Explicit metadata wins; otherwise the first known repository name that
/// prefixes the slug is taken, in iteration order. When one repository name
/// prefixes another, whichever appears first in `known` wins; ambiguity is
/// not re-tiebroken here.
pub fn resolve_parent(metadata: Option<&str>, slug: &str, known: &[String]) -> Option<String> {
    if let Some(repo) = metadata.map(str::trim).filter(|r| !r.is_empty()) {
        return Some(repo.to_string());
    }
    known.iter().find(|candidate| slug.starts_with(candidate.as_str())).cloned()
}

/// Classifies solution checklists against the solution ledger
pub struct SolutionVerifier<'a> {
    checklists: &'a ChecklistStore,
    ledger: &'a LedgerStore,
}

impl<'a> SolutionVerifier<'a> {
    /// Create a verifier over the given stores
    pub fn new(checklists: &'a ChecklistStore, ledger: &'a LedgerStore) -> Self {
        Self { checklists, ledger }
    }

    /// Verify every discovered solution checklist
    pub fn verify_all(
        &self,
        repo_names: &[String],
        ignore_repo_completion: bool,
    ) -> Result<Vec<(SolutionInfo, VerificationResult)>> {
        let paths = self.checklists.discover(ChecklistKind::Solution)?;
        self.verify(&paths, repo_names, ignore_repo_completion)
    }

    /// Verify the given solution checklists, preserving input order.
    ///
    /// `repo_names` acts as both the prefix-resolution universe and, unless
    /// `ignore_repo_completion` is set, an allow-list: a solution whose
    /// parent cannot be resolved into the list is skipped entirely. In
    /// ignore mode every discoverable solution is processed, falling back to
    /// the slug itself as parent when nothing better resolves.
    pub fn verify(
        &self,
        paths: &[PathBuf],
        repo_names: &[String],
        ignore_repo_completion: bool,
    ) -> Result<Vec<(SolutionInfo, VerificationResult)>> {
        let entries = self.ledger.read_solution_entries()?;
        debug!(
            checklist_count = paths.len(),
            ledger_rows = entries.len(),
            ignore_repo_completion,
            "verify: starting batch"
        );

        let mut results = Vec::new();

        for path in paths {
            let slug = slug_for(path, ChecklistKind::Solution);

            let doc = match self.checklists.load(path, ChecklistKind::Solution) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "verify: unable to read checklist");
                    let info = SolutionInfo {
                        slug: slug.clone(),
                        display_name: None,
                        parent_repo: None,
                        checklist_path: path.clone(),
                    };
                    results.push((
                        info,
                        VerificationResult {
                            entity: slug,
                            checklist_path: path.clone(),
                            unmet_reasons: vec!["failed to read checklist file".to_string()],
                            mandatory_total: 0,
                            mandatory_completed: 0,
                        },
                    ));
                    continue;
                }
            };

            let metadata = doc.repository.as_deref();
            let parent = if ignore_repo_completion {
                Some(
                    resolve_parent(metadata, &slug, repo_names).unwrap_or_else(|| slug.clone()),
                )
            } else {
                match metadata {
                    Some(repo) if repo_names.iter().any(|r| r == repo) => Some(repo.to_string()),
                    _ => resolve_parent(None, &slug, repo_names),
                }
            };

            let Some(parent) = parent else {
                debug!(slug = %slug, "verify: parent repository not in allow-list, skipping");
                continue;
            };

            let aliases = alias_set(&slug, doc.title.as_deref());
            let mut unmet_reasons = Vec::new();

            if doc.title.is_none() {
                unmet_reasons.push("solution display name missing from checklist header".to_string());
            }

            if doc.tasks.is_empty() {
                unmet_reasons.push(NO_MANDATORY_TASKS.to_string());
            } else {
                unmet_reasons.extend(task_reasons(&doc.tasks, &entries, &parent, Some(&aliases[..])));

                let (missing_vars, _verified) = classify_variables(&doc.variables, &[]);
                for name in missing_vars {
                    unmet_reasons.push(format!("variable not populated: {}", name));
                }
            }

            debug!(slug = %slug, parent = %parent, unmet = unmet_reasons.len(), "verify: solution checked");
            let info = SolutionInfo {
                slug: slug.clone(),
                display_name: doc.title.clone(),
                parent_repo: Some(parent),
                checklist_path: path.clone(),
            };
            results.push((
                info,
                VerificationResult {
                    entity: slug,
                    checklist_path: path.clone(),
                    unmet_reasons,
                    mandatory_total: doc.tasks.len(),
                    mandatory_completed: doc.completed_count(),
                },
            ));
        }

        Ok(results)
    }
}
