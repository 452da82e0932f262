use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use checkstore::cli::{Cli, Command, OutputFormat};
use checkstore::{ChecklistKind, ChecklistStore, LedgerStore, count_entries};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn store_for(checklist: &std::path::Path) -> Result<ChecklistStore> {
    let parent = checklist
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    ChecklistStore::open(parent)
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    info!("checkstore starting");

    match cli.command {
        Command::Tasks { checklist, format } => {
            let kind = ChecklistKind::infer(&checklist);
            let store = store_for(&checklist)?;
            let doc = store.load(&checklist, kind)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&doc.tasks)?),
                OutputFormat::Text => {
                    for task in &doc.tasks {
                        let marker = if task.done { "[x]".green() } else { "[ ]".yellow() };
                        println!("{} @{}", marker, task.reference);
                    }
                }
            }
        }
        Command::Vars { checklist, format } => {
            let kind = ChecklistKind::infer(&checklist);
            let store = store_for(&checklist)?;
            let doc = store.load(&checklist, kind)?;
            match format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = doc
                        .variables
                        .iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
                OutputFormat::Text => {
                    for (name, value) in &doc.variables {
                        if value.is_empty() {
                            println!("{} {}", name.cyan(), "(blank)".dimmed());
                        } else {
                            println!("{} {}", name.cyan(), value);
                        }
                    }
                }
            }
        }
        Command::Reset { checklist } => {
            let kind = ChecklistKind::infer(&checklist);
            let store = store_for(&checklist)?;
            if store.reset_tasks(&checklist, kind)? {
                println!("{} Reset tasks in {}", "\u{2713}".green(), checklist.display());
            } else {
                eprintln!("{} Tasks section not found in {}", "\u{2717}".red(), checklist.display());
                std::process::exit(1);
            }
        }
        Command::Count { dir, repo, solution, task } => {
            let store = LedgerStore::open(&dir)?;
            let count = match solution {
                Some(solution) => {
                    let entries = store.read_solution_entries()?;
                    let aliases = vec![solution];
                    count_entries(&entries, &repo, Some(&aliases[..]), &task)
                }
                None => {
                    let entries = store.read_repo_entries()?;
                    count_entries(&entries, &repo, None, &task)
                }
            };
            println!("{}", count);
        }
    }

    Ok(())
}
