//! Task and variable line parsing
//!
//! Checklist lines come from hand-edited markdown that has drifted across
//! template revisions, so parsing is a set of named patterns tried in
//! priority order rather than a single grammar:
//!
//! - strict task lines carry a checkbox, a `[MANDATORY]` tag, and a trailing
//!   `@reference` token
//! - relaxed task lines only need the checkbox and reference token (used as a
//!   fallback when a document matches zero strict lines)
//! - variable lines accept `{name}` or `{{name}}`, an ASCII `->` or Unicode
//!   `→` arrow, and a legacy `- name: value` colon form

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::section::collect_section_lines;

static MANDATORY_TASK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[(x| )\].*\[MANDATORY\].*?@([A-Za-z0-9-]+)").expect("valid pattern"));

static RELAXED_TASK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[(x| )\].*?@([A-Za-z0-9-]+)").expect("valid pattern"));

static VAR_ARROW_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \{\{?([A-Za-z0-9_]+)\}\}? *(?:→|->) *(.*)$").expect("valid pattern"));

static VAR_COLON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- *([A-Za-z0-9_]+)\s*[:=]\s*(.*)$").expect("valid pattern"));

/// Values treated as "not populated" after trimming (case-insensitive)
const BLANK_VALUE_MARKERS: [&str; 6] = ["", "(blank)", "blank", "n/a", "na", "(none)"];

/// One mandatory task line: reference token plus completion flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLine {
    /// Reference token identifying the external operation (without `@`)
    pub reference: String,

    /// Whether the checkbox is `[x]`
    pub done: bool,
}

/// Extract mandatory tasks from the named section, preserving line order.
///
/// The strict pattern is tried first; when it matches nothing and `relaxed`
/// is set, any checkbox line with a reference token is accepted as mandatory.
/// First occurrence wins for duplicate reference tokens. A document without
/// the section (or without task lines) yields an empty vec.
pub fn extract_tasks(lines: &[&str], headings: &[&str], relaxed: bool) -> Vec<TaskLine> {
    let section = collect_section_lines(lines, headings);

    let mut tasks = match_tasks(&section, &MANDATORY_TASK_PATTERN);
    if tasks.is_empty() && relaxed {
        debug!("extract_tasks: no strict matches, trying relaxed pattern");
        tasks = match_tasks(&section, &RELAXED_TASK_PATTERN);
    }

    debug!(task_count = tasks.len(), "extract_tasks: done");
    tasks
}

fn match_tasks(section: &[&str], pattern: &Regex) -> Vec<TaskLine> {
    let mut tasks: Vec<TaskLine> = Vec::new();
    for line in section {
        if let Some(caps) = pattern.captures(line.trim()) {
            let reference = caps[2].to_string();
            if tasks.iter().any(|t| t.reference == reference) {
                continue;
            }
            tasks.push(TaskLine {
                reference,
                done: &caps[1] == "x",
            });
        }
    }
    tasks
}

/// Parse a single checklist variable line into `(name, value)`.
///
/// Returns `None` for task lines (`- [`) and anything not matching the arrow
/// or colon forms.
pub fn parse_variable_line(line: &str) -> Option<(String, String)> {
    let stripped = line.trim();
    if !stripped.starts_with("- ") || stripped.starts_with("- [") {
        return None;
    }
    if let Some(caps) = VAR_ARROW_PATTERN.captures(stripped) {
        return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
    }
    if let Some(caps) = VAR_COLON_PATTERN.captures(stripped) {
        return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
    }
    None
}

/// Extract `name -> value` bindings from the named section, first occurrence
/// wins on duplicate names.
pub fn extract_variables(lines: &[&str], headings: &[&str]) -> Vec<(String, String)> {
    let section = collect_section_lines(lines, headings);
    let mut values: Vec<(String, String)> = Vec::new();

    for line in section {
        if let Some((name, value)) = parse_variable_line(line) {
            if values.iter().any(|(n, _)| *n == name) {
                continue;
            }
            values.push((name, value));
        }
    }

    debug!(variable_count = values.len(), "extract_variables: done");
    values
}

/// Return true when the value should be treated as blank
pub fn is_blank_value(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    BLANK_VALUE_MARKERS.contains(&normalized.as_str())
}

/// Split variables into (missing, verified) name lists, skipping names in
/// the optional set.
pub fn classify_variables(variables: &[(String, String)], optional: &[&str]) -> (Vec<String>, Vec<String>) {
    let mut missing = Vec::new();
    let mut verified = Vec::new();

    for (name, value) in variables {
        if optional.contains(&name.as_str()) {
            continue;
        }
        if is_blank_value(value) {
            missing.push(name.clone());
        } else {
            verified.push(name.clone());
        }
    }

    (missing, verified)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO_TASKS: &str = "\
## Repo Tasks
- [ ] (1) [MANDATORY] [SCRIPTABLE] Clone repository to local directory → @task-clone-repo
- [x] (2) [MANDATORY] [SCRIPTABLE] Find all solution files in repository → @task-find-solutions
- [ ] (3) [OPTIONAL] Collect extra diagnostics → @task-collect-diagnostics-x
";

    fn lines(doc: &str) -> Vec<&str> {
        doc.lines().collect()
    }

    #[test]
    fn test_strict_pattern_requires_mandatory_tag() {
        let lines = lines(REPO_TASKS);
        let tasks = extract_tasks(&lines, &["## Repo Tasks"], false);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].reference, "task-clone-repo");
        assert!(!tasks[0].done);
        assert_eq!(tasks[1].reference, "task-find-solutions");
        assert!(tasks[1].done);
    }

    #[test]
    fn test_relaxed_fallback_accepts_any_checkbox_line() {
        let doc = "\
### Tasks
- [x] restore dependencies → @task-restore-solution
- [ ] build → @task-build-solution
";
        let lines = lines(doc);

        // Strict-only finds nothing (no [MANDATORY] tags).
        assert!(extract_tasks(&lines, &["### Tasks"], false).is_empty());

        let tasks = extract_tasks(&lines, &["### Tasks"], true);
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].done);
        assert!(!tasks[1].done);
    }

    #[test]
    fn test_relaxed_fallback_not_used_when_strict_matches() {
        let doc = "\
### Tasks
- [x] [MANDATORY] restore → @task-restore-solution
- [ ] informational note → @not-a-task
";
        let lines = lines(doc);
        let tasks = extract_tasks(&lines, &["### Tasks"], true);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].reference, "task-restore-solution");
    }

    #[test]
    fn test_duplicate_reference_first_occurrence_wins() {
        let doc = "\
## Repo Tasks
- [ ] [MANDATORY] first → @task-clone-repo
- [x] [MANDATORY] second → @task-clone-repo
";
        let lines = lines(doc);
        let tasks = extract_tasks(&lines, &["## Repo Tasks"], false);

        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].done);
    }

    #[test]
    fn test_parse_variable_line_double_brace_unicode_arrow() {
        let parsed = parse_variable_line("- {{repo_url}} → https://example.com/acme");
        assert_eq!(
            parsed,
            Some(("repo_url".to_string(), "https://example.com/acme".to_string()))
        );
    }

    #[test]
    fn test_parse_variable_line_single_brace_ascii_arrow() {
        let parsed = parse_variable_line("- {clone_path} -> ./clone_repos/acme");
        assert_eq!(parsed, Some(("clone_path".to_string(), "./clone_repos/acme".to_string())));
    }

    #[test]
    fn test_parse_variable_line_colon_form() {
        let parsed = parse_variable_line("- readme_filename: README.md");
        assert_eq!(parsed, Some(("readme_filename".to_string(), "README.md".to_string())));
    }

    #[test]
    fn test_parse_variable_line_rejects_task_lines() {
        assert_eq!(parse_variable_line("- [x] [MANDATORY] clone → @task-clone-repo"), None);
    }

    #[test]
    fn test_parse_variable_line_blank_value() {
        let parsed = parse_variable_line("- {{solutions_json}} →");
        assert_eq!(parsed, Some(("solutions_json".to_string(), String::new())));
    }

    #[test]
    fn test_extract_variables_first_occurrence_wins() {
        let doc = "\
## Repo Variables Available
- {{repo_name}} → acme
- {{repo_name}} → other
";
        let lines = lines(doc);
        let vars = extract_variables(&lines, &["## Repo Variables Available"]);

        assert_eq!(vars, vec![("repo_name".to_string(), "acme".to_string())]);
    }

    #[test]
    fn test_is_blank_value_markers() {
        assert!(is_blank_value(""));
        assert!(is_blank_value("   "));
        assert!(is_blank_value("n/a"));
        assert!(is_blank_value("N/A"));
        assert!(is_blank_value("(none)"));
        assert!(is_blank_value("(Blank)"));
        assert!(is_blank_value("blank"));
        assert!(!is_blank_value("./clone_repos/acme"));
        assert!(!is_blank_value("0"));
    }

    #[test]
    fn test_classify_variables_with_optional_exclusions() {
        let vars = vec![
            ("repo_url".to_string(), "https://example.com/acme".to_string()),
            ("clone_path".to_string(), String::new()),
            ("executed_commands".to_string(), String::new()),
        ];
        let (missing, verified) = classify_variables(&vars, &["executed_commands"]);

        assert_eq!(missing, vec!["clone_path"]);
        assert_eq!(verified, vec!["repo_url"]);
    }
}
