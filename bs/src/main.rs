//! Buildsweep - bulk repository build evaluation orchestrator
//!
//! CLI entry point for generating checklists, running retry passes, and
//! inspecting verification state.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use buildsweep::cli::{Cli, Command};
use buildsweep::config::Config;
use buildsweep::exec::ProcessRunner;
use buildsweep::orchestrator::{Orchestrator, RunOptions};
use buildsweep::reset::ResetOperator;
use buildsweep::verify::{
    RepoVerifier, SolutionVerifier, write_repo_verification_report, write_solution_verification_report,
};
use checkstore::{ChecklistKind, ChecklistStore, LedgerStore, has_find_solutions, slug_for};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO default.
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            append,
            repo_only,
            solutions_only,
            ignore_repo_completion,
            input,
        } => {
            cmd_run(
                config,
                RunOptions {
                    append,
                    repo_only,
                    solutions_only,
                    ignore_repo_completion,
                },
                input,
            )
            .await
        }
        Command::Generate { append, input } => cmd_generate(config, append, input),
        Command::Verify {
            solutions,
            report,
            ignore_repo_completion,
        } => cmd_verify(config, solutions, report, ignore_repo_completion),
        Command::Reset { checklist } => cmd_reset(config, checklist),
    }
}

/// Run the full workflow and exit non-zero on any unresolved failure
async fn cmd_run(mut config: Config, options: RunOptions, input: Option<PathBuf>) -> Result<()> {
    debug!(?options, "cmd_run: called");
    if let Some(input) = input {
        config.input_file = input;
    }

    let working_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let runner = Arc::new(ProcessRunner::new(&config.runner, working_dir));
    let orchestrator = Orchestrator::new(config, runner);

    let summary = orchestrator.run(&options).await?;
    summary.print_console();

    if !summary.fully_successful() {
        std::process::exit(1);
    }
    Ok(())
}

/// Generate checklists without running any passes
fn cmd_generate(config: Config, append: bool, input: Option<PathBuf>) -> Result<()> {
    debug!(append, "cmd_generate: called");
    let input_file = input.unwrap_or(config.input_file);
    let checklists = ChecklistStore::open(&config.tasks_dir)?;

    let generator = buildsweep::generate::ChecklistGenerator::new()?;
    let report = generator.generate(&checklists, &input_file, append)?;

    println!(
        "Generated {} checklist(s), skipped {}, from {} repositories",
        report.repositories_processed, report.repositories_skipped, report.repositories_total
    );
    for error in &report.errors {
        eprintln!("{} {}", "\u{2717}".red(), error);
    }
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Verify checklists read-only, printing unmet reasons
fn cmd_verify(config: Config, solutions: bool, report: bool, ignore_repo_completion: bool) -> Result<()> {
    debug!(solutions, report, "cmd_verify: called");
    let checklists = ChecklistStore::open(&config.tasks_dir)?;
    let ledger = LedgerStore::open(&config.results_dir)?;

    let mut unmet_total = 0usize;

    if solutions {
        let repo_paths = checklists.discover(ChecklistKind::Repo)?;
        let known: Vec<String> = repo_paths.iter().map(|p| slug_for(p, ChecklistKind::Repo)).collect();
        let allowed: Vec<String> = if ignore_repo_completion {
            known
        } else {
            let entries = ledger.read_repo_entries()?;
            known.into_iter().filter(|name| has_find_solutions(&entries, name)).collect()
        };

        let verifier = SolutionVerifier::new(&checklists, &ledger);
        let results = verifier.verify_all(&allowed, ignore_repo_completion)?;
        for (info, result) in &results {
            print_verification(&info.slug, &result.unmet_reasons);
            unmet_total += usize::from(!result.is_satisfied());
        }
        if report {
            let flat: Vec<_> = results.into_iter().map(|(_, r)| r).collect();
            write_solution_verification_report(&flat, &config.output_dir, &config.results_dir)?;
        }
    } else {
        let verifier = RepoVerifier::new(&checklists, &ledger);
        let results = verifier.verify_all()?;
        for result in &results {
            print_verification(&result.entity, &result.unmet_reasons);
            unmet_total += usize::from(!result.is_satisfied());
        }
        if report {
            write_repo_verification_report(&results, &config.output_dir, &config.results_dir)?;
        }
    }

    if unmet_total > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_verification(entity: &str, unmet_reasons: &[String]) {
    if unmet_reasons.is_empty() {
        println!("{} {}: OK", "\u{2713}".green(), entity);
    } else {
        println!("{} {}:", "\u{2717}".red(), entity);
        for reason in unmet_reasons {
            println!("    - {}", reason);
        }
    }
}

/// Reset one checklist and purge its ledger rows
fn cmd_reset(config: Config, checklist: PathBuf) -> Result<()> {
    debug!(checklist = %checklist.display(), "cmd_reset: called");
    let checklists = ChecklistStore::open(&config.tasks_dir)?;
    let ledger = LedgerStore::open(&config.results_dir)?;
    let operator = ResetOperator::new(&checklists, &ledger);

    let kind = ChecklistKind::infer(&checklist);
    let ok = match kind {
        ChecklistKind::Repo => {
            let name = slug_for(&checklist, ChecklistKind::Repo);
            operator.reset_repo(&name, &checklist)
        }
        ChecklistKind::Solution => {
            let slug = slug_for(&checklist, ChecklistKind::Solution);
            let doc = checklists.load(&checklist, ChecklistKind::Solution)?;
            let parent = doc.repository.clone().unwrap_or_else(|| slug.clone());
            operator.reset_solution(&parent, &slug, doc.title.as_deref(), &checklist)
        }
    };

    if ok {
        println!("{} Reset {}", "\u{2713}".green(), checklist.display());
        Ok(())
    } else {
        eprintln!("{} Could not reset {}", "\u{2717}".red(), checklist.display());
        std::process::exit(1);
    }
}
