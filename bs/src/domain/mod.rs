//! Domain types for the sweep state machine

mod summary;

pub use summary::{
    EntityKind, RepoDetail, SUMMARY_FILENAME, SolutionDetail, UnresolvedFailure, WorkflowStatus, WorkflowSummary,
};

use std::path::PathBuf;

use serde::Serialize;

use crate::exec::ExecStatus;

/// Terminal and non-terminal states of one tracked entity.
///
/// `Pending` entities are picked up by the next pass; `Pass` and `Fail` are
/// terminal. `Fail` is only assigned once the pass budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityState {
    Pending,
    Running,
    Pass,
    Fail,
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Result of verifying one entity in one pass.
///
/// Produced fresh on every pass and never cached across passes; the
/// orchestrator only uses it to decide retry vs. give up.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Entity identifier (repo name or solution slug)
    pub entity: String,

    /// Checklist the verification read
    pub checklist_path: PathBuf,

    /// Human-readable reasons the entity is not satisfied, empty when it is
    pub unmet_reasons: Vec<String>,

    /// Total mandatory tasks discovered
    pub mandatory_total: usize,

    /// Mandatory tasks with the checkbox set
    pub mandatory_completed: usize,
}

impl VerificationResult {
    /// True when the entity has no unmet reasons
    pub fn is_satisfied(&self) -> bool {
        self.unmet_reasons.is_empty()
    }
}

/// One execute+verify attempt for an entity
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// 1-based pass number
    pub pass: u32,

    /// Outcome of the runner invocation
    pub execution_status: ExecStatus,

    /// Exit code of the runner invocation
    pub exit_code: i32,

    /// Error detail when the invocation failed
    pub error_message: Option<String>,

    /// Whether verification found the entity satisfied after this attempt
    pub verified: bool,

    /// Unmet reasons from verification after this attempt
    pub unmet_reasons: Vec<String>,
}

/// Identity of one solution checklist
#[derive(Debug, Clone, Serialize)]
pub struct SolutionInfo {
    /// Name slug from the checklist filename
    pub slug: String,

    /// Display name from the checklist title (the solution-path stem)
    pub display_name: Option<String>,

    /// Parent repository, when resolvable
    pub parent_repo: Option<String>,

    /// Path to the solution checklist
    pub checklist_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_state_display() {
        assert_eq!(EntityState::Pending.to_string(), "PENDING");
        assert_eq!(EntityState::Pass.to_string(), "PASS");
        assert_eq!(EntityState::Fail.to_string(), "FAIL");
    }

    #[test]
    fn test_entity_state_serializes_uppercase() {
        let json = serde_json::to_string(&EntityState::Fail).unwrap();
        assert_eq!(json, "\"FAIL\"");
    }

    #[test]
    fn test_verification_result_satisfied() {
        let result = VerificationResult {
            entity: "acme".to_string(),
            checklist_path: PathBuf::from("tasks/acme_repo_checklist.md"),
            unmet_reasons: vec![],
            mandatory_total: 2,
            mandatory_completed: 2,
        };
        assert!(result.is_satisfied());

        let unmet = VerificationResult {
            unmet_reasons: vec!["incomplete: task-clone-repo".to_string()],
            ..result
        };
        assert!(!unmet.is_satisfied());
    }
}
