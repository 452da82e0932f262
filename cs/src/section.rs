//! Markdown section collection
//!
//! Checklist documents are divided into sections by level-2 and level-3
//! headings. Section membership runs from the first matching heading up to
//! the next heading of either level, or end of document.

use tracing::debug;

/// Heading prefixes that delimit sections
const SECTION_PREFIXES: [&str; 2] = ["## ", "### "];

/// Return true when the (already trimmed) line is a section heading
pub fn is_heading(stripped: &str) -> bool {
    SECTION_PREFIXES.iter().any(|p| stripped.starts_with(p))
}

/// Collect the lines of the first section whose heading matches any of the
/// provided heading prefixes (case-insensitive).
///
/// A document with no matching heading yields an empty vec, never an error.
pub fn collect_section_lines<'a>(lines: &[&'a str], headings: &[&str]) -> Vec<&'a str> {
    let wanted: Vec<String> = headings.iter().map(|h| h.to_lowercase()).collect();
    let mut content = Vec::new();
    let mut in_section = false;

    for line in lines {
        let stripped = line.trim();
        if is_heading(stripped) {
            let lower = stripped.to_lowercase();
            if wanted.iter().any(|h| lower.starts_with(h.as_str())) {
                in_section = true;
                continue;
            }
            if in_section {
                break;
            }
        } else if in_section {
            content.push(*line);
        }
    }

    debug!(line_count = content.len(), ?headings, "collect_section_lines: done");
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Task Checklist: acme
Repository: https://example.com/acme

## Repo Tasks
- [ ] one
- [x] two

## Repo Variables Available
- {{repo_url}} -> https://example.com/acme
";

    fn lines(doc: &str) -> Vec<&str> {
        doc.lines().collect()
    }

    #[test]
    fn test_collects_first_matching_section() {
        let lines = lines(DOC);
        let section = collect_section_lines(&lines, &["## Repo Tasks"]);

        assert_eq!(section, vec!["- [ ] one", "- [x] two", ""]);
    }

    #[test]
    fn test_stops_at_next_heading() {
        let lines = lines(DOC);
        let section = collect_section_lines(&lines, &["## Repo Tasks"]);

        assert!(!section.iter().any(|l| l.contains("repo_url")));
    }

    #[test]
    fn test_heading_match_is_case_insensitive() {
        let lines = lines(DOC);
        let section = collect_section_lines(&lines, &["## repo tasks"]);

        assert_eq!(section.len(), 3);
    }

    #[test]
    fn test_missing_section_yields_empty() {
        let lines = lines(DOC);
        let section = collect_section_lines(&lines, &["## Solution Tasks"]);

        assert!(section.is_empty());
    }

    #[test]
    fn test_level_three_heading_variant() {
        let doc = "# Solution Checklist: x\n\n### Tasks\n- [ ] a\n\n### Solution Variables\n- {{v}} ->\n";
        let lines: Vec<&str> = doc.lines().collect();
        let section = collect_section_lines(&lines, &["## Solution Tasks", "### Tasks"]);

        assert_eq!(section, vec!["- [ ] a", ""]);
    }

    #[test]
    fn test_multiple_heading_candidates_take_first_present() {
        let doc = "## Solution Variables\n- {{a}} -> 1\n";
        let lines: Vec<&str> = doc.lines().collect();
        let section = collect_section_lines(&lines, &["## Solution Variables Available", "## Solution Variables"]);

        assert_eq!(section, vec!["- {{a}} -> 1"]);
    }
}
