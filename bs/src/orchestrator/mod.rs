//! The retry orchestrator
//!
//! Top-level control loop: bootstrap (clean, generate checklists once,
//! format pre-check), then up to `max_passes` execute-then-verify passes
//! over pending repositories, then the same over pending solutions, then
//! one consolidated summary. Within a pass every pending entity executes
//! before a single batched verification reads the ledger, so the whole
//! pass is judged against one consistent snapshot.
//!
//! Solutions are gated on their parent repository having a successful
//! solution-discovery ledger row, not on the repository reaching PASS. A
//! repository that exhausted its passes can still have its solutions
//! attempted, as long as discovery once succeeded.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{Context, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use checkstore::{ChecklistStore, LedgerStore, has_find_solutions};

use crate::config::Config;
use crate::domain::{
    AttemptRecord, EntityKind, EntityState, RepoDetail, SolutionDetail, SolutionInfo, UnresolvedFailure,
    VerificationResult, WorkflowStatus, WorkflowSummary,
};
use crate::exec::{CommandResult, TaskRunner};
use crate::generate::ChecklistGenerator;
use crate::reset::ResetOperator;
use crate::verify::{
    RepoVerifier, SolutionVerifier, verify_repo_checklist_format, write_repo_verification_report,
    write_solution_verification_report,
};

/// Options for one orchestrator run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Preserve existing tracking state instead of wiping the directories
    pub append: bool,

    /// Run only the repository phase
    pub repo_only: bool,

    /// Run only the solution phase (implies append semantics for state)
    pub solutions_only: bool,

    /// Process solutions regardless of their parent's discovery state
    pub ignore_repo_completion: bool,
}

/// Mutable per-repository tracking for the pass loop
struct RepoSlot {
    name: String,
    checklist_path: PathBuf,
    state: EntityState,
    attempts: Vec<AttemptRecord>,
    last_reasons: Vec<String>,
}

/// Mutable per-solution tracking for the pass loop
struct SolutionSlot {
    info: SolutionInfo,
    state: EntityState,
    attempts: Vec<AttemptRecord>,
    last_reasons: Vec<String>,
}

/// The top-level control loop
pub struct Orchestrator {
    config: Config,
    runner: Arc<dyn TaskRunner>,
}

impl Orchestrator {
    /// Create an orchestrator with the injected task runner
    pub fn new(config: Config, runner: Arc<dyn TaskRunner>) -> Self {
        Self { config, runner }
    }

    /// Execute a full run and return the consolidated summary.
    ///
    /// Processing one entity never halts its siblings; only a bootstrap
    /// failure (generation or format pre-check) aborts the run early, and
    /// even then a summary is written.
    pub async fn run(&self, options: &RunOptions) -> Result<WorkflowSummary> {
        let start = Utc::now();
        let run_id = Uuid::now_v7().to_string();
        info!(%run_id, ?options, "run: starting");

        if !options.append && !options.solutions_only {
            self.clean_directories()?;
        } else {
            debug!("run: preserving existing tracking state");
        }

        let checklists = ChecklistStore::open(&self.config.tasks_dir)?;
        let ledger = LedgerStore::open(&self.config.results_dir)?;
        fs::create_dir_all(&self.config.output_dir).context("Failed to create output directory")?;

        if !options.solutions_only {
            if let Some(summary) = self.bootstrap(&checklists, options, start, &run_id)? {
                return Ok(summary);
            }
        }

        // Repository phase: terminal states for every repository before any
        // solution work begins.
        let mut repo_slots = self.init_repo_slots(&checklists, &ledger)?;
        if !options.solutions_only {
            self.run_repo_passes(&checklists, &ledger, &mut repo_slots).await?;

            let verifier = RepoVerifier::new(&checklists, &ledger);
            match verifier.verify_all() {
                Ok(results) => {
                    if let Err(e) =
                        write_repo_verification_report(&results, &self.config.output_dir, &self.config.results_dir)
                    {
                        warn!(error = %e, "run: failed to write repo verification report");
                    }
                }
                Err(e) => warn!(error = %e, "run: final repo verification failed"),
            }
        }

        // Solution phase, gated on ledger-recorded discovery.
        let mut solution_slots = Vec::new();
        if !options.repo_only {
            let known: Vec<String> = repo_slots.iter().map(|s| s.name.clone()).collect();
            let allowed = if options.ignore_repo_completion {
                known
            } else {
                let entries = ledger.read_repo_entries()?;
                known.into_iter().filter(|name| has_find_solutions(&entries, name)).collect()
            };
            debug!(allowed_count = allowed.len(), "run: repositories admitted to solution phase");

            solution_slots =
                self.init_solution_slots(&checklists, &ledger, &allowed, options.ignore_repo_completion)?;
            self.run_solution_passes(&checklists, &ledger, &mut solution_slots, &allowed, options)
                .await?;

            let verifier = SolutionVerifier::new(&checklists, &ledger);
            match verifier.verify_all(&allowed, options.ignore_repo_completion) {
                Ok(results) => {
                    let flat: Vec<VerificationResult> = results.into_iter().map(|(_, r)| r).collect();
                    if let Err(e) =
                        write_solution_verification_report(&flat, &self.config.output_dir, &self.config.results_dir)
                    {
                        warn!(error = %e, "run: failed to write solution verification report");
                    }
                }
                Err(e) => warn!(error = %e, "run: final solution verification failed"),
            }
        }

        let summary = self.build_summary(options, start, &run_id, None, &repo_slots, &solution_slots);
        if let Err(e) = summary.write_json(&self.config.output_dir) {
            warn!(error = %e, "run: failed to write summary");
        }
        info!(status = ?summary.workflow_status, "run: done");
        Ok(summary)
    }

    /// One-time bootstrap: checklist generation and format pre-check.
    /// Returns a FAIL summary when either step fails.
    fn bootstrap(
        &self,
        checklists: &ChecklistStore,
        options: &RunOptions,
        start: DateTime<Utc>,
        run_id: &str,
    ) -> Result<Option<WorkflowSummary>> {
        let generator = ChecklistGenerator::new()?;
        let report = generator.generate(checklists, &self.config.input_file, options.append)?;

        let report_path = self.config.output_dir.join("generate-repo-checklists.json");
        if let Err(e) = fs::write(&report_path, serde_json::to_string_pretty(&report)?) {
            warn!(error = %e, "bootstrap: failed to write generation report");
        }

        if !report.is_success() {
            warn!(errors = ?report.errors, "bootstrap: checklist generation failed");
            let message = format!("checklist generation failed: {}", report.errors.join("; "));
            let summary = self.build_summary(options, start, run_id, Some(message), &[], &[]);
            summary.write_json(&self.config.output_dir)?;
            return Ok(Some(summary));
        }

        let format_report = verify_repo_checklist_format(checklists)?;
        if let Err(e) = format_report.write(&self.config.output_dir, &self.config.results_dir) {
            warn!(error = %e, "bootstrap: failed to write format report");
        }
        if !format_report.all_passed() {
            warn!(issues = ?format_report.issues, "bootstrap: format pre-check failed");
            let message = format!("checklist format verification failed: {}", format_report.issues.join("; "));
            let summary = self.build_summary(options, start, run_id, Some(message), &[], &[]);
            summary.write_json(&self.config.output_dir)?;
            return Ok(Some(summary));
        }

        debug!("bootstrap: complete");
        Ok(None)
    }

    /// Remove tracked files from the tasks, results, and output directories
    fn clean_directories(&self) -> Result<()> {
        for dir in [&self.config.results_dir, &self.config.tasks_dir, &self.config.output_dir] {
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(dir).context(format!("Failed to list directory: {}", dir.display()))? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
                debug!(path = %path.display(), "clean_directories: removed");
            }
        }
        Ok(())
    }

    /// Discover repository checklists and classify their starting state
    fn init_repo_slots(&self, checklists: &ChecklistStore, ledger: &LedgerStore) -> Result<Vec<RepoSlot>> {
        let verifier = RepoVerifier::new(checklists, ledger);
        let results = verifier.verify_all()?;

        let slots: Vec<RepoSlot> = results
            .into_iter()
            .map(|r| {
                let state = if r.is_satisfied() { EntityState::Pass } else { EntityState::Pending };
                RepoSlot {
                    name: r.entity,
                    checklist_path: r.checklist_path,
                    state,
                    attempts: Vec::new(),
                    last_reasons: r.unmet_reasons,
                }
            })
            .collect();

        info!(
            total = slots.len(),
            pending = slots.iter().filter(|s| s.state == EntityState::Pending).count(),
            "init_repo_slots: discovered repositories"
        );
        Ok(slots)
    }

    /// Discover admitted solution checklists and classify their starting state
    fn init_solution_slots(
        &self,
        checklists: &ChecklistStore,
        ledger: &LedgerStore,
        allowed: &[String],
        ignore_repo_completion: bool,
    ) -> Result<Vec<SolutionSlot>> {
        let verifier = SolutionVerifier::new(checklists, ledger);
        let results = verifier.verify_all(allowed, ignore_repo_completion)?;

        let slots: Vec<SolutionSlot> = results
            .into_iter()
            .map(|(info, r)| {
                let state = if r.is_satisfied() { EntityState::Pass } else { EntityState::Pending };
                SolutionSlot {
                    info,
                    state,
                    attempts: Vec::new(),
                    last_reasons: r.unmet_reasons,
                }
            })
            .collect();

        info!(
            total = slots.len(),
            pending = slots.iter().filter(|s| s.state == EntityState::Pending).count(),
            "init_solution_slots: discovered solutions"
        );
        Ok(slots)
    }

    /// Run the bounded pass loop over pending repositories
    async fn run_repo_passes(
        &self,
        checklists: &ChecklistStore,
        ledger: &LedgerStore,
        slots: &mut [RepoSlot],
    ) -> Result<()> {
        let reset_op = ResetOperator::new(checklists, ledger);

        for pass in 1..=self.config.max_passes {
            let pending: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.state == EntityState::Pending)
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() {
                debug!(pass, "run_repo_passes: nothing pending, stopping early");
                break;
            }
            info!(pass, max_passes = self.config.max_passes, count = pending.len(), "run_repo_passes: pass start");

            // Execute every pending repository before any verification.
            let mut exec_results: Vec<(usize, CommandResult)> = Vec::with_capacity(pending.len());
            for &idx in &pending {
                slots[idx].state = EntityState::Running;
                let params = vec![
                    ("repo_checklist".to_string(), slots[idx].checklist_path.display().to_string()),
                    ("clone".to_string(), self.config.clone_dir.display().to_string()),
                ];
                info!(repo = %slots[idx].name, pass, "run_repo_passes: executing");
                let result = self.runner.run("execute-repo-task", &params).await;
                if !result.is_success() {
                    warn!(repo = %slots[idx].name, exit_code = result.exit_code, "run_repo_passes: execution failed, continuing to next repository");
                }
                exec_results.push((idx, result));
            }

            // One batched verification over the whole pass.
            let paths: Vec<PathBuf> = pending.iter().map(|&i| slots[i].checklist_path.clone()).collect();
            let verifier = RepoVerifier::new(checklists, ledger);
            let verifications = verifier.verify(&paths)?;

            for ((idx, exec), verification) in exec_results.into_iter().zip(verifications) {
                let name = slots[idx].name.clone();
                let path = slots[idx].checklist_path.clone();
                let slot = &mut slots[idx];
                self.settle_entity(
                    pass,
                    exec,
                    verification,
                    &mut slot.state,
                    &mut slot.attempts,
                    &mut slot.last_reasons,
                    || reset_op.reset_repo(&name, &path),
                );
            }
        }
        Ok(())
    }

    /// Run the bounded pass loop over pending solutions
    async fn run_solution_passes(
        &self,
        checklists: &ChecklistStore,
        ledger: &LedgerStore,
        slots: &mut [SolutionSlot],
        allowed: &[String],
        options: &RunOptions,
    ) -> Result<()> {
        let reset_op = ResetOperator::new(checklists, ledger);

        for pass in 1..=self.config.max_passes {
            let pending: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.state == EntityState::Pending)
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() {
                debug!(pass, "run_solution_passes: nothing pending, stopping early");
                break;
            }
            info!(pass, max_passes = self.config.max_passes, count = pending.len(), "run_solution_passes: pass start");

            let mut exec_results: Vec<(usize, CommandResult)> = Vec::with_capacity(pending.len());
            for &idx in &pending {
                slots[idx].state = EntityState::Running;
                let params = vec![(
                    "solution_checklist".to_string(),
                    slots[idx].info.checklist_path.display().to_string(),
                )];
                info!(solution = %slots[idx].info.slug, pass, "run_solution_passes: executing");
                let result = self.runner.run("execute-solution-task", &params).await;
                if !result.is_success() {
                    warn!(solution = %slots[idx].info.slug, exit_code = result.exit_code, "run_solution_passes: execution failed, continuing to next solution");
                }
                exec_results.push((idx, result));
            }

            let paths: Vec<PathBuf> = pending.iter().map(|&i| slots[i].info.checklist_path.clone()).collect();
            let verifier = SolutionVerifier::new(checklists, ledger);
            let verifications = verifier.verify(&paths, allowed, options.ignore_repo_completion)?;
            let mut by_slug: std::collections::HashMap<String, VerificationResult> =
                verifications.into_iter().map(|(info, r)| (info.slug, r)).collect();

            for (idx, exec) in exec_results {
                let slug = slots[idx].info.slug.clone();
                let Some(verification) = by_slug.remove(&slug) else {
                    warn!(solution = %slug, "run_solution_passes: solution missing from verification batch");
                    continue;
                };
                let parent = slots[idx].info.parent_repo.clone().unwrap_or_else(|| slug.clone());
                let display = slots[idx].info.display_name.clone();
                let path = slots[idx].info.checklist_path.clone();
                let slot = &mut slots[idx];
                self.settle_entity(
                    pass,
                    exec,
                    verification,
                    &mut slot.state,
                    &mut slot.attempts,
                    &mut slot.last_reasons,
                    || reset_op.reset_solution(&parent, &slug, display.as_deref(), &path),
                );
            }
        }
        Ok(())
    }

    /// Apply the pass-transition rules to one entity: PASS when satisfied,
    /// terminal FAIL on the last pass, otherwise reset+purge and stay
    /// PENDING. A failed reset is unretryable and goes terminal immediately.
    #[allow(clippy::too_many_arguments)]
    fn settle_entity(
        &self,
        pass: u32,
        exec: CommandResult,
        verification: VerificationResult,
        state: &mut EntityState,
        attempts: &mut Vec<AttemptRecord>,
        last_reasons: &mut Vec<String>,
        reset: impl FnOnce() -> bool,
    ) {
        let satisfied = verification.is_satisfied();
        attempts.push(AttemptRecord {
            pass,
            execution_status: exec.status,
            exit_code: exec.exit_code,
            error_message: exec.error_message,
            verified: satisfied,
            unmet_reasons: verification.unmet_reasons.clone(),
        });
        *last_reasons = verification.unmet_reasons;

        if satisfied {
            info!(entity = %verification.entity, pass, "settle_entity: PASS");
            *state = EntityState::Pass;
        } else if pass >= self.config.max_passes {
            info!(entity = %verification.entity, pass, "settle_entity: terminal FAIL after final pass");
            *state = EntityState::Fail;
        } else if reset() {
            debug!(entity = %verification.entity, pass, "settle_entity: reset for retry");
            *state = EntityState::Pending;
        } else {
            warn!(entity = %verification.entity, pass, "settle_entity: reset failed, cannot retry");
            last_reasons.push("reset failed, entity cannot be retried".to_string());
            *state = EntityState::Fail;
        }
    }

    /// Assemble the consolidated summary from final slot states
    fn build_summary(
        &self,
        options: &RunOptions,
        start: DateTime<Utc>,
        run_id: &str,
        error_message: Option<String>,
        repo_slots: &[RepoSlot],
        solution_slots: &[SolutionSlot],
    ) -> WorkflowSummary {
        let end = Utc::now();

        let repository_details: Vec<RepoDetail> = repo_slots
            .iter()
            .map(|s| RepoDetail {
                repo_name: s.name.clone(),
                checklist_path: s.checklist_path.clone(),
                final_state: s.state,
                attempts: s.attempts.clone(),
            })
            .collect();
        let solution_details: Vec<SolutionDetail> = solution_slots
            .iter()
            .map(|s| SolutionDetail {
                solution_name: s.info.slug.clone(),
                display_name: s.info.display_name.clone(),
                parent_repo: s.info.parent_repo.clone(),
                checklist_path: s.info.checklist_path.clone(),
                final_state: s.state,
                attempts: s.attempts.clone(),
            })
            .collect();

        let mut unresolved_failures: Vec<UnresolvedFailure> = Vec::new();
        for slot in repo_slots.iter().filter(|s| s.state == EntityState::Fail) {
            unresolved_failures.push(UnresolvedFailure {
                kind: EntityKind::Repository,
                name: slot.name.clone(),
                reasons: slot.last_reasons.clone(),
            });
        }
        for slot in solution_slots.iter().filter(|s| s.state == EntityState::Fail) {
            unresolved_failures.push(UnresolvedFailure {
                kind: EntityKind::Solution,
                name: slot.info.slug.clone(),
                reasons: slot.last_reasons.clone(),
            });
        }

        let successful_repositories = repo_slots.iter().filter(|s| s.state == EntityState::Pass).count();
        let failed_repositories = repo_slots.iter().filter(|s| s.state == EntityState::Fail).count();
        let successful_solutions = solution_slots.iter().filter(|s| s.state == EntityState::Pass).count();
        let failed_solutions = solution_slots.iter().filter(|s| s.state == EntityState::Fail).count();

        let total_failed = failed_repositories + failed_solutions;
        let total_successful = successful_repositories + successful_solutions;
        let workflow_status = if error_message.is_some() {
            WorkflowStatus::Fail
        } else if total_failed == 0 {
            WorkflowStatus::Success
        } else if total_successful > 0 {
            WorkflowStatus::PartialSuccess
        } else {
            WorkflowStatus::Fail
        };

        WorkflowSummary {
            run_id: run_id.to_string(),
            append_mode: options.append,
            workflow_status,
            error_message,
            total_repositories: repo_slots.len(),
            processed_repositories: repo_slots.iter().filter(|s| !s.attempts.is_empty()).count(),
            successful_repositories,
            failed_repositories,
            repository_details,
            total_solutions: solution_slots.len(),
            processed_solutions: solution_slots.iter().filter(|s| !s.attempts.is_empty()).count(),
            successful_solutions,
            failed_solutions,
            solution_details,
            unresolved_failures,
            start_time: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end_time: end.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: (end - start).num_milliseconds() as f64 / 1000.0,
        }
    }
}
