//! CLI argument parsing for checkstore

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cs")]
#[command(author, version, about = "Inspect buildsweep checklist and ledger files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the mandatory tasks parsed from a checklist
    Tasks {
        /// Path to the checklist file
        #[arg(required = true)]
        checklist: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the variable bindings parsed from a checklist
    Vars {
        /// Path to the checklist file
        #[arg(required = true)]
        checklist: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Reset every done checkbox in a checklist's tasks section
    Reset {
        /// Path to the checklist file
        #[arg(required = true)]
        checklist: PathBuf,
    },

    /// Count ledger rows for an owner and task reference
    Count {
        /// Results directory containing the ledger CSV files
        #[arg(short, long, default_value = "./results")]
        dir: PathBuf,

        /// Repository name
        #[arg(short, long, required = true)]
        repo: String,

        /// Solution name (searches the solution ledger when given)
        #[arg(short, long)]
        solution: Option<String>,

        /// Task reference (with or without the leading @)
        #[arg(short, long, required = true)]
        task: String,
    },
}

/// Output format for inspection commands
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_tasks() {
        let cli = Cli::parse_from(["cs", "tasks", "tasks/acme_repo_checklist.md"]);
        assert!(matches!(cli.command, Command::Tasks { .. }));
    }

    #[test]
    fn test_cli_parse_count() {
        let cli = Cli::parse_from(["cs", "count", "--repo", "acme", "--task", "task-clone-repo"]);
        if let Command::Count { repo, solution, task, .. } = cli.command {
            assert_eq!(repo, "acme");
            assert!(solution.is_none());
            assert_eq!(task, "task-clone-repo");
        } else {
            panic!("Expected Count command");
        }
    }

    #[test]
    fn test_cli_parse_tasks_json_format() {
        let cli = Cli::parse_from(["cs", "tasks", "x.md", "--format", "json"]);
        if let Command::Tasks { format, .. } = cli.command {
            assert!(matches!(format, OutputFormat::Json));
        } else {
            panic!("Expected Tasks command");
        }
    }
}
