//! One-time checklist generation
//!
//! Reads the repository list, derives repository names from URLs, and
//! renders one checklist per repository plus the master checklist. Runs
//! exactly once per orchestrator invocation, before the first pass; it is
//! the only step whose failure aborts a run.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use eyre::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use checkstore::{ChecklistStore, MASTER_CHECKLIST_NAME};

/// Handlebars template for a repository checklist. Escaped `\{{...}}`
/// expressions render as literal variable placeholders in the output.
const REPO_CHECKLIST_TEMPLATE: &str = r#"# Task Checklist: {{repo_name}}
Repository: {{repo_url}}
Generated: {{timestamp}}

## Repo Tasks (Sequential Pipeline - Complete in Order)
- [ ] (1) [MANDATORY] [SCRIPTABLE] Clone repository to local directory → @task-clone-repo
- [ ] (2) [MANDATORY] [SCRIPTABLE] Find all solution files in repository → @task-find-solutions
- [ ] (3) [MANDATORY] [SCRIPTABLE] Generate per-solution checklist files → @task-generate-solution-task-checklists
- [ ] (4) [MANDATORY] [SCRIPTABLE] Search for README file in repository → @task-search-readme
- [ ] (5) [MANDATORY] [NON-SCRIPTABLE] Scan README and extract setup commands → @task-scan-readme
- [ ] (6) [MANDATORY] [NON-SCRIPTABLE] Execute safe commands from README → @task-execute-readme

## Repo Variables Available
- \{{repo_url}} → {{repo_url}}
- \{{repo_name}} → {{repo_name}}
- \{{clone_path}} →
- \{{repo_directory}} →
- \{{solutions_json}} →
- \{{readme_content}} →
- \{{readme_filename}} →
- \{{commands_extracted}} →
- \{{executed_commands}} →
- \{{skipped_commands}} →

## For Agents Resuming Work
Follow these rules *exactly* when resuming execution:

1. Identify the **first `[ ]` task** in the checklist.
2. [MANDATORY] tasks must be completed in numbered order (1 → 2 → 3 → 4 → 5 → 6)
3. Execute its corresponding prompt file (from `@task-...`).
4. After successful completion, update this checklist and mark `[x]`.
5. Do **not** end the run until all required tasks are completed.
"#;

/// One repository from the input list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub name: String,
    pub url: String,
}

/// Outcome of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub input_file: String,
    pub append_mode: bool,
    pub repositories_total: usize,
    pub repositories_processed: usize,
    pub repositories_skipped: usize,
    pub generated_paths: Vec<String>,
    pub master_checklist_path: Option<String>,
    pub errors: Vec<String>,
    pub status: String,
    pub timestamp: String,
}

impl GenerationReport {
    /// True when generation completed without errors
    pub fn is_success(&self) -> bool {
        self.status == "SUCCESS"
    }
}

/// Strip trailing slashes from a repository URL
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Derive the repository name from its URL: the segment after `/_git/` when
/// present, otherwise the last path segment, with any `.git` suffix removed.
pub fn derive_repo_name(url: &str) -> String {
    let segment = match url.split_once("/_git/") {
        Some((_, rest)) => rest,
        None => url.rsplit('/').next().unwrap_or(url),
    };
    let segment = segment.trim_end_matches('/');
    let lower = segment.to_lowercase();
    if lower.ends_with(".git") {
        segment[..segment.len() - 4].to_string()
    } else {
        segment.to_string()
    }
}

/// Read and normalize the repository input list.
///
/// Blank lines and `#` comments are skipped; anything not starting with
/// `https://` is collected into the ignored list. Entries are deduplicated
/// case-insensitively by derived name and returned sorted by name.
pub fn read_repository_list(path: &Path) -> Result<(Vec<RepoEntry>, Vec<String>)> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read repository list: {}", path.display()))?;

    let mut entries: Vec<RepoEntry> = Vec::new();
    let mut ignored: Vec<String> = Vec::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.to_lowercase().starts_with("https://") {
            ignored.push(raw.to_string());
            continue;
        }
        let url = normalize_url(line);
        let name = derive_repo_name(&url);
        if name.is_empty() {
            ignored.push(raw.to_string());
            continue;
        }
        entries.push(RepoEntry { name, url });
    }

    entries.sort_by_key(|e| e.name.to_lowercase());
    let mut seen: HashSet<String> = HashSet::new();
    entries.retain(|e| seen.insert(e.name.to_lowercase()));

    debug!(entry_count = entries.len(), ignored_count = ignored.len(), "read_repository_list: done");
    Ok((entries, ignored))
}

/// Renders repository checklists and the master checklist
pub struct ChecklistGenerator {
    handlebars: Handlebars<'static>,
}

impl ChecklistGenerator {
    /// Create a generator with the checklist template registered
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string("repo_checklist", REPO_CHECKLIST_TEMPLATE)
            .context("Failed to register checklist template")?;
        Ok(Self { handlebars })
    }

    /// Generate checklists for every repository in the input file.
    ///
    /// In append mode existing per-repo checklists and master entries are
    /// preserved and only new repositories are added; otherwise every file
    /// is rewritten. A generated file failing post-write validation is
    /// removed and recorded as an error.
    pub fn generate(&self, store: &ChecklistStore, input_file: &Path, append: bool) -> Result<GenerationReport> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut errors: Vec<String> = Vec::new();

        let (repos, ignored) = match read_repository_list(input_file) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "generate: input list unreadable");
                return Ok(GenerationReport {
                    input_file: input_file.display().to_string(),
                    append_mode: append,
                    repositories_total: 0,
                    repositories_processed: 0,
                    repositories_skipped: 0,
                    generated_paths: vec![],
                    master_checklist_path: None,
                    errors: vec![format!("input file not found: {}", input_file.display())],
                    status: "FAIL".to_string(),
                    timestamp,
                });
            }
        };
        if !ignored.is_empty() {
            info!(ignored_count = ignored.len(), "generate: ignored non-https input lines");
        }

        let master_path = store.tasks_dir().join(MASTER_CHECKLIST_NAME);
        if let Err(e) = self.write_master(&master_path, &repos, append, &timestamp) {
            errors.push(format!("master checklist write failed: {}", e));
        }

        let mut generated_paths: Vec<String> = Vec::new();
        let mut skipped = 0usize;

        for repo in &repos {
            let filename = format!("{}_repo_checklist.md", repo.name);
            let path = store.tasks_dir().join(&filename);

            if append && path.exists() {
                debug!(repo = %repo.name, "generate: existing checklist preserved");
                skipped += 1;
                continue;
            }

            let content = match self.handlebars.render(
                "repo_checklist",
                &json!({
                    "repo_name": repo.name,
                    "repo_url": repo.url,
                    "timestamp": timestamp,
                }),
            ) {
                Ok(content) => content,
                Err(e) => {
                    errors.push(format!("{}: render failed: {}", repo.name, e));
                    continue;
                }
            };

            if let Err(e) = fs::write(&path, &content) {
                errors.push(format!("{}: write failed: {}", repo.name, e));
                continue;
            }

            if let Err(issue) = validate_generated(&path) {
                let _ = fs::remove_file(&path);
                errors.push(format!("{}: {}", repo.name, issue));
                continue;
            }

            generated_paths.push(path.display().to_string());
        }

        let status = if errors.is_empty() { "SUCCESS" } else { "FAIL" };
        info!(
            total = repos.len(),
            generated = generated_paths.len(),
            skipped,
            errors = errors.len(),
            "generate: done"
        );

        Ok(GenerationReport {
            input_file: input_file.display().to_string(),
            append_mode: append,
            repositories_total: repos.len(),
            repositories_processed: generated_paths.len(),
            repositories_skipped: skipped,
            generated_paths,
            master_checklist_path: master_path.exists().then(|| master_path.display().to_string()),
            errors,
            status: status.to_string(),
            timestamp,
        })
    }

    fn write_master(&self, path: &Path, repos: &[RepoEntry], append: bool, timestamp: &str) -> Result<()> {
        let mut lines: Vec<String> = Vec::new();

        if append && path.exists() {
            let existing = fs::read_to_string(path)?;
            lines = existing.lines().map(str::to_string).collect();
            for line in lines.iter_mut() {
                if line.starts_with("Generated: ") {
                    *line = format!("Generated: {}", timestamp);
                    break;
                }
            }
            let existing_names: HashSet<String> = lines
                .iter()
                .filter_map(|l| master_entry_name(l))
                .map(|n| n.to_lowercase())
                .collect();
            for repo in repos {
                if !existing_names.contains(&repo.name.to_lowercase()) {
                    lines.push(format!("- [ ] {} [{}]", repo.name, repo.url));
                }
            }
        } else {
            lines.push(format!("Generated: {}", timestamp));
            for repo in repos {
                lines.push(format!("- [ ] {} [{}]", repo.name, repo.url));
            }
        }

        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(path, content).context(format!("Failed to write master checklist: {}", path.display()))?;
        Ok(())
    }
}

/// Extract the repository name from a master checklist entry line
fn master_entry_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("- [ ] ").or_else(|| line.strip_prefix("- [x] "))?;
    rest.split_whitespace().next()
}

/// Check the structure of a freshly generated checklist: exactly one title
/// header and one variables heading.
fn validate_generated(path: &Path) -> std::result::Result<(), String> {
    let content = fs::read_to_string(path).map_err(|e| format!("validation read failed: {}", e))?;
    let titles = content.lines().filter(|l| l.starts_with("# Task Checklist:")).count();
    let var_headings = content
        .lines()
        .filter(|l| l.starts_with("## Repo Variables Available"))
        .count();
    if titles != 1 || var_headings != 1 {
        return Err("header count validation failed".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkstore::{ChecklistKind, parse_checklist};
    use tempfile::tempdir;

    #[test]
    fn test_derive_repo_name_variants() {
        assert_eq!(derive_repo_name("https://example.com/org/acme"), "acme");
        assert_eq!(derive_repo_name("https://example.com/org/acme.git"), "acme");
        assert_eq!(derive_repo_name("https://example.com/org/Acme.GIT"), "Acme");
        assert_eq!(derive_repo_name("https://example.com/proj/_git/spool-service"), "spool-service");
    }

    #[test]
    fn test_read_repository_list_filters_and_dedupes() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("repositories.txt");
        fs::write(
            &input,
            "# comment\n\nhttps://example.com/org/zeta\nnot-a-url\nhttps://example.com/org/acme/\nhttps://example.com/other/ACME\n",
        )
        .unwrap();

        let (repos, ignored) = read_repository_list(&input).unwrap();

        assert_eq!(ignored, vec!["not-a-url"]);
        assert_eq!(repos.len(), 2);
        // Sorted by name, case-insensitive dedupe keeps the first occurrence.
        assert_eq!(repos[0].name, "acme");
        assert_eq!(repos[0].url, "https://example.com/org/acme");
        assert_eq!(repos[1].name, "zeta");
    }

    #[test]
    fn test_generate_renders_parseable_checklists() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path().join("tasks")).unwrap();
        let input = temp.path().join("repositories.txt");
        fs::write(&input, "https://example.com/org/acme\n").unwrap();

        let generator = ChecklistGenerator::new().unwrap();
        let report = generator.generate(&store, &input, false).unwrap();

        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.repositories_processed, 1);

        let path = store.tasks_dir().join("acme_repo_checklist.md");
        let content = fs::read_to_string(&path).unwrap();
        // Placeholders render literally, values render substituted.
        assert!(content.contains("- {{repo_url}} → https://example.com/org/acme"));
        assert!(content.contains("- {{clone_path}} →\n"));

        let doc = parse_checklist(&content, &path, ChecklistKind::Repo);
        assert_eq!(doc.title.as_deref(), Some("acme"));
        assert_eq!(doc.tasks.len(), 6);
        assert!(doc.tasks.iter().all(|t| !t.done));
        assert_eq!(doc.variables.len(), 10);
    }

    #[test]
    fn test_generate_writes_master_checklist() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path().join("tasks")).unwrap();
        let input = temp.path().join("repositories.txt");
        fs::write(&input, "https://example.com/org/acme\nhttps://example.com/org/zeta\n").unwrap();

        let generator = ChecklistGenerator::new().unwrap();
        let report = generator.generate(&store, &input, false).unwrap();
        assert!(report.master_checklist_path.is_some());

        let master = fs::read_to_string(store.tasks_dir().join(MASTER_CHECKLIST_NAME)).unwrap();
        assert!(master.starts_with("Generated: "));
        assert!(master.contains("- [ ] acme [https://example.com/org/acme]"));
        assert!(master.contains("- [ ] zeta [https://example.com/org/zeta]"));
    }

    #[test]
    fn test_generate_append_preserves_existing() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path().join("tasks")).unwrap();
        let input = temp.path().join("repositories.txt");
        fs::write(&input, "https://example.com/org/acme\n").unwrap();

        let generator = ChecklistGenerator::new().unwrap();
        generator.generate(&store, &input, false).unwrap();

        // Simulate progress, then regenerate in append mode with a new repo.
        let acme_path = store.tasks_dir().join("acme_repo_checklist.md");
        let marked = fs::read_to_string(&acme_path).unwrap().replacen("- [ ] (1)", "- [x] (1)", 1);
        fs::write(&acme_path, &marked).unwrap();
        fs::write(&input, "https://example.com/org/acme\nhttps://example.com/org/zeta\n").unwrap();

        let report = generator.generate(&store, &input, true).unwrap();

        assert_eq!(report.repositories_skipped, 1);
        assert_eq!(report.repositories_processed, 1);
        let after = fs::read_to_string(&acme_path).unwrap();
        assert!(after.contains("- [x] (1)"), "append must not clobber progress");
        assert!(store.tasks_dir().join("zeta_repo_checklist.md").exists());

        let master = fs::read_to_string(store.tasks_dir().join(MASTER_CHECKLIST_NAME)).unwrap();
        assert_eq!(master.matches("- [ ] acme ").count(), 1);
        assert!(master.contains("- [ ] zeta "));
    }

    #[test]
    fn test_generate_missing_input_reports_failure() {
        let temp = tempdir().unwrap();
        let store = ChecklistStore::open(temp.path().join("tasks")).unwrap();

        let generator = ChecklistGenerator::new().unwrap();
        let report = generator.generate(&store, &temp.path().join("missing.txt"), false).unwrap();

        assert!(!report.is_success());
        assert!(report.errors[0].contains("input file not found"));
    }
}
