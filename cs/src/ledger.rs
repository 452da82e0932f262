//! CSV result ledger store
//!
//! Execution results are tracked in small CSV files that have been written by
//! several generations of tooling, so the reader is deliberately tolerant:
//! column names are resolved through synonym lists, the field delimiter is
//! detected per line (comma or pipe), and a missing file is simply zero
//! entries. The one strict rule lives in [`count_entries`]: a satisfied task
//! must have exactly one matching row: zero means it never ran, more than
//! one means stale duplicates, and callers report those as distinct failures.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use eyre::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::FIND_SOLUTIONS_TASK;

/// Repo-level ledger filenames, in read order
pub const REPO_LEDGER_FILES: [&str; 1] = ["repo-results.csv"];

/// Solution-level ledger filenames, in read order (second is legacy)
pub const SOLUTION_LEDGER_FILES: [&str; 2] = ["solution-results.csv", "solution_result.csv"];

static SOLUTION_COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*solutions?").expect("valid pattern"));

/// One normalized ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Owning repository name
    pub repo: String,

    /// Owning solution name, when the file carries a solution column
    pub solution: Option<String>,

    /// Task reference (may or may not carry a leading `@` in the file)
    pub task: String,

    /// Recorded outcome status text
    pub status: String,

    /// Row timestamp, when the file carries a timestamp column
    pub timestamp: Option<String>,

    /// Filename the row was read from
    pub source: String,
}

/// Column indices resolved from a header row
#[derive(Debug, Default)]
struct ColumnMap {
    repo: Option<usize>,
    solution: Option<usize>,
    task: Option<usize>,
    status: Option<usize>,
    timestamp: Option<usize>,
}

const REPO_COLUMNS: [&str; 3] = ["repo", "repo_name", "repository"];
const SOLUTION_COLUMNS: [&str; 2] = ["solution", "solution_name"];
const TASK_COLUMNS: [&str; 3] = ["task name", "task_name", "task"];
const STATUS_COLUMNS: [&str; 1] = ["status"];
const TIMESTAMP_COLUMNS: [&str; 1] = ["timestamp"];

/// Split a ledger line on its detected delimiter: pipe when present,
/// comma otherwise. Pipe-delimited rows embed commas in status text, so
/// pipe wins when both appear.
fn split_row(line: &str) -> Vec<String> {
    let delimiter = if line.contains('|') { '|' } else { ',' };
    line.split(delimiter).map(|f| f.trim().to_string()).collect()
}

/// Resolve logical columns from a header row. Returns `None` when the row
/// does not look like a ledger header (no repo or task column).
fn resolve_columns(header: &[String]) -> Option<ColumnMap> {
    let mut map = ColumnMap::default();
    for (idx, name) in header.iter().enumerate() {
        let name = name.trim().to_lowercase();
        if map.repo.is_none() && REPO_COLUMNS.contains(&name.as_str()) {
            map.repo = Some(idx);
        } else if map.solution.is_none() && SOLUTION_COLUMNS.contains(&name.as_str()) {
            map.solution = Some(idx);
        } else if map.task.is_none() && TASK_COLUMNS.contains(&name.as_str()) {
            map.task = Some(idx);
        } else if map.status.is_none() && STATUS_COLUMNS.contains(&name.as_str()) {
            map.status = Some(idx);
        } else if map.timestamp.is_none() && TIMESTAMP_COLUMNS.contains(&name.as_str()) {
            map.timestamp = Some(idx);
        }
    }
    if map.repo.is_some() && map.task.is_some() { Some(map) } else { None }
}

fn entry_from_row(row: &[String], map: &ColumnMap, source: &str) -> Option<LedgerEntry> {
    let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(|f| f.trim().to_string());

    let repo = field(map.repo)?;
    let task = field(map.task)?;
    if repo.is_empty() || task.is_empty() {
        return None;
    }

    Some(LedgerEntry {
        repo,
        solution: field(map.solution).filter(|s| !s.is_empty()),
        task,
        status: field(map.status).unwrap_or_default(),
        timestamp: field(map.timestamp).filter(|t| !t.is_empty()),
        source: source.to_string(),
    })
}

fn normalize_task(task: &str) -> String {
    task.trim().trim_start_matches('@').to_lowercase()
}

/// Count ledger rows matching an owner, an optional solution alias set, and
/// a task reference.
///
/// Repository names compare exactly (trimmed); task references compare
/// case-insensitively with any leading `@` stripped on either side; a
/// solution row matches when its recorded name equals any alias,
/// case-insensitively.
pub fn count_entries(entries: &[LedgerEntry], repo: &str, solution_aliases: Option<&[String]>, task: &str) -> usize {
    let repo = repo.trim();
    let wanted_task = normalize_task(task);
    let aliases: Option<Vec<String>> =
        solution_aliases.map(|set| set.iter().map(|a| a.trim().to_lowercase()).collect());

    entries
        .iter()
        .filter(|entry| {
            if entry.repo.trim() != repo {
                return false;
            }
            if normalize_task(&entry.task) != wanted_task {
                return false;
            }
            match (&aliases, &entry.solution) {
                (Some(aliases), Some(solution)) => aliases.contains(&solution.trim().to_lowercase()),
                (Some(_), None) => false,
                (None, _) => true,
            }
        })
        .count()
}

/// True when the repository has a successful solution-discovery row
pub fn has_find_solutions(entries: &[LedgerEntry], repo: &str) -> bool {
    let repo = repo.trim();
    entries.iter().any(|entry| {
        entry.repo.trim() == repo
            && normalize_task(&entry.task) == FIND_SOLUTIONS_TASK
            && !entry.status.to_lowercase().contains("fail")
    })
}

/// Solution count recorded by the solution-discovery row, when present.
///
/// The status column of a discovery row optionally carries `N solutions`;
/// a row without the token counts as zero.
pub fn solution_count(entries: &[LedgerEntry], repo: &str) -> Option<u32> {
    let repo = repo.trim();
    entries
        .iter()
        .find(|entry| entry.repo.trim() == repo && normalize_task(&entry.task) == FIND_SOLUTIONS_TASK)
        .map(|entry| {
            SOLUTION_COUNT_PATTERN
                .captures(&entry.status)
                .and_then(|caps| caps[1].parse().ok())
                .unwrap_or(0)
        })
}

/// Store for the CSV ledgers under a results directory
pub struct LedgerStore {
    results_dir: PathBuf,
}

impl LedgerStore {
    /// Open or create a ledger store at the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let results_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&results_dir).context("Failed to create results directory")?;
        debug!(?results_dir, "Opened ledger store");
        Ok(Self { results_dir })
    }

    /// Directory this store reads and writes
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Read all repo-level ledger entries. Missing files are zero entries.
    pub fn read_repo_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.read_files(&REPO_LEDGER_FILES)
    }

    /// Read all solution-level ledger entries (current plus legacy file).
    pub fn read_solution_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.read_files(&SOLUTION_LEDGER_FILES)
    }

    fn read_files(&self, names: &[&str]) -> Result<Vec<LedgerEntry>> {
        let mut entries = Vec::new();

        for name in names {
            let path = self.results_dir.join(name);
            if !path.exists() {
                continue;
            }
            let content =
                fs::read_to_string(&path).context(format!("Failed to read ledger: {}", path.display()))?;
            let mut lines = content.lines().filter(|l| !l.trim().is_empty());

            let Some(header_line) = lines.next() else {
                continue;
            };
            let Some(map) = resolve_columns(&split_row(header_line)) else {
                warn!(file = %name, "read_files: unrecognized ledger header, skipping file");
                continue;
            };

            for line in lines {
                if let Some(entry) = entry_from_row(&split_row(line), &map, name) {
                    entries.push(entry);
                }
            }
        }

        debug!(entry_count = entries.len(), ?names, "read_files: done");
        Ok(entries)
    }

    /// Append a repo-level result row, creating the file with a header when
    /// missing. Rows carry a timestamp and an outcome symbol.
    pub fn append_repo(&self, repo: &str, task: &str, status: &str) -> Result<()> {
        let path = self.results_dir.join(REPO_LEDGER_FILES[0]);
        let mut file = open_for_append(&path, "timestamp,repo_name,task_name,status,symbol")?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let symbol = if status.to_lowercase().contains("fail") { "\u{274C}" } else { "\u{2705}" };
        writeln!(file, "{},{},{},{},{}", timestamp, repo, task, status, symbol)
            .context(format!("Failed to append ledger row: {}", path.display()))?;
        Ok(())
    }

    /// Append a solution-level result row, creating the file with a header
    /// when missing.
    pub fn append_solution(&self, repo: &str, solution: &str, task: &str, status: &str) -> Result<()> {
        let path = self.results_dir.join(SOLUTION_LEDGER_FILES[0]);
        let mut file = open_for_append(&path, "repo,solution,task name,status")?;
        writeln!(file, "{},{},{},{}", repo, solution, task, status)
            .context(format!("Failed to append ledger row: {}", path.display()))?;
        Ok(())
    }

    /// Delete repo-level rows matching the repository and any of the given
    /// task references. Returns the number of rows removed.
    pub fn purge_repo_rows(&self, repo: &str, tasks: &[String]) -> Result<usize> {
        self.purge_files(&REPO_LEDGER_FILES, repo, None, tasks)
    }

    /// Delete solution-level rows matching the repository, any name in the
    /// alias set, and any of the given task references.
    pub fn purge_solution_rows(&self, repo: &str, aliases: &[String], tasks: &[String]) -> Result<usize> {
        self.purge_files(&SOLUTION_LEDGER_FILES, repo, Some(aliases), tasks)
    }

    fn purge_files(
        &self,
        names: &[&str],
        repo: &str,
        aliases: Option<&[String]>,
        tasks: &[String],
    ) -> Result<usize> {
        let wanted_tasks: Vec<String> = tasks.iter().map(|t| normalize_task(t)).collect();
        let mut removed = 0usize;

        for name in names {
            let path = self.results_dir.join(name);
            if !path.exists() {
                continue;
            }
            let content =
                fs::read_to_string(&path).context(format!("Failed to read ledger: {}", path.display()))?;
            let mut lines = content.lines();

            let Some(header_line) = lines.next() else {
                continue;
            };
            let Some(map) = resolve_columns(&split_row(header_line)) else {
                continue;
            };

            let mut kept: Vec<&str> = vec![header_line];
            let mut removed_here = 0usize;

            for line in lines {
                let matches = entry_from_row(&split_row(line), &map, name).is_some_and(|entry| {
                    entry.repo.trim() == repo.trim()
                        && wanted_tasks.contains(&normalize_task(&entry.task))
                        && match (aliases, &entry.solution) {
                            (Some(aliases), Some(solution)) => {
                                let solution = solution.trim().to_lowercase();
                                aliases.iter().any(|a| a.trim().to_lowercase() == solution)
                            }
                            (Some(_), None) => false,
                            (None, _) => true,
                        }
                });
                if matches {
                    removed_here += 1;
                } else {
                    kept.push(line);
                }
            }

            if removed_here > 0 {
                let mut new_content = kept.join("\n");
                if content.ends_with('\n') {
                    new_content.push('\n');
                }
                fs::write(&path, new_content)
                    .context(format!("Failed to rewrite ledger: {}", path.display()))?;
                debug!(file = %name, removed = removed_here, "purge_files: rewrote ledger");
            }
            removed += removed_here;
        }

        Ok(removed)
    }
}

fn open_for_append(path: &Path, header: &str) -> Result<fs::File> {
    let needs_header = !path.exists();
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(format!("Failed to open ledger: {}", path.display()))?;
    if needs_header {
        writeln!(file, "{}", header).context(format!("Failed to write ledger header: {}", path.display()))?;
    }
    Ok(file)
}
