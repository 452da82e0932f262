//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Buildsweep - bulk repository build evaluation orchestrator
#[derive(Parser)]
#[command(
    name = "buildsweep",
    about = "Checklist-driven bulk repository build evaluation",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full workflow: generate checklists, then retry passes over
    /// repositories and solutions
    Run {
        /// Preserve existing tracking files instead of wiping them
        #[arg(long)]
        append: bool,

        /// Process only the repository phase
        #[arg(long, conflicts_with = "solutions_only")]
        repo_only: bool,

        /// Process only the solution phase
        #[arg(long)]
        solutions_only: bool,

        /// Attempt solutions even when their repository never recorded
        /// solution discovery
        #[arg(long)]
        ignore_repo_completion: bool,

        /// Repository list input file (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Generate repository checklists from the input list, without running
    Generate {
        /// Preserve existing checklists, adding only new repositories
        #[arg(long)]
        append: bool,

        /// Repository list input file (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Verify checklists against the ledgers, read-only
    Verify {
        /// Verify solution checklists instead of repository checklists
        #[arg(long)]
        solutions: bool,

        /// Write JSON/markdown report artifacts
        #[arg(long)]
        report: bool,

        /// Include solutions regardless of repository discovery state
        #[arg(long)]
        ignore_repo_completion: bool,
    },

    /// Reset one checklist's checkboxes and purge its ledger rows
    Reset {
        /// Path to the checklist to reset
        checklist: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["bs", "run"]);
        if let Command::Run {
            append,
            repo_only,
            solutions_only,
            ignore_repo_completion,
            input,
        } = cli.command
        {
            assert!(!append);
            assert!(!repo_only);
            assert!(!solutions_only);
            assert!(!ignore_repo_completion);
            assert!(input.is_none());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_append_and_input() {
        let cli = Cli::parse_from(["bs", "run", "--append", "--input", "repos.txt"]);
        if let Command::Run { append, input, .. } = cli.command {
            assert!(append);
            assert_eq!(input, Some(PathBuf::from("repos.txt")));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_phase_flags_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["bs", "run", "--repo-only", "--solutions-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_verify_solutions() {
        let cli = Cli::parse_from(["bs", "verify", "--solutions", "--report"]);
        if let Command::Verify { solutions, report, .. } = cli.command {
            assert!(solutions);
            assert!(report);
        } else {
            panic!("Expected Verify command");
        }
    }

    #[test]
    fn test_cli_parse_reset() {
        let cli = Cli::parse_from(["bs", "reset", "tasks/acme_repo_checklist.md"]);
        assert!(matches!(cli.command, Command::Reset { .. }));
    }

    #[test]
    fn test_cli_with_config_and_log_level() {
        let cli = Cli::parse_from(["bs", "-c", "/path/to/config.yml", "-l", "DEBUG", "run"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("DEBUG"));
    }
}
