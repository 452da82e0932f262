//! Task runner adapter
//!
//! Every external operation (cloning, solution discovery, restore, build)
//! goes through one interface: an operation name and parameter map in, a
//! [`CommandResult`] out. Non-zero exits, launch failures, and
//! timeouts all surface as a FAIL-status result, never as an error crossing
//! the orchestrator boundary; the orchestrator inspects the status field and
//! keeps going.

mod process;

pub mod mock;

pub use process::ProcessRunner;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Outcome classification of a runner invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecStatus {
    Success,
    Fail,
}

/// Failure modes of launching the external command
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to launch command: {0}")]
    Launch(#[from] std::io::Error),

    #[error("command timed out after {0}ms")]
    Timeout(u64),
}

/// Result of one runner invocation
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// Success/fail classification (exit code 0 is success)
    pub status: ExecStatus,

    /// Process exit code (-1 when no code was produced)
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Failure detail, when status is FAIL
    pub error_message: Option<String>,
}

impl CommandResult {
    /// Build a success result
    pub fn success(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::Success,
            exit_code: 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error_message: None,
        }
    }

    /// Build a failure result with the causing detail embedded
    pub fn fail(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::Fail,
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            error_message: Some(message.into()),
        }
    }

    /// True when the invocation succeeded
    pub fn is_success(&self) -> bool {
        self.status == ExecStatus::Success
    }
}

/// The injected external command interface.
///
/// Operations are named after the runner's prompt files
/// (`execute-repo-task`, `execute-solution-task`, ...); parameters keep
/// their insertion order on the built command line.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Invoke one operation and classify the outcome
    async fn run(&self, operation: &str, params: &[(String, String)]) -> CommandResult;
}
