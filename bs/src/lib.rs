//! Buildsweep - bulk repository build evaluation orchestrator
//!
//! Buildsweep drives an opaque external task runner over a fleet of
//! repositories and the build solutions found inside them, tracking progress
//! in plain text: one markdown checklist per entity and CSV result ledgers.
//! The orchestrator retries incomplete entities in bounded passes, resetting
//! partial state between attempts so a retry always starts clean.
//!
//! # Core Concepts
//!
//! - **State in Files**: checklist checkboxes and ledger rows are the only
//!   persistence; the final file tree is the run's artifact
//! - **Corroborated Completion**: a task counts as done only when its
//!   checkbox is set AND exactly one ledger row records it
//! - **Execute Then Verify**: each pass executes every pending entity before
//!   a single batched verification reads the ledger snapshot
//! - **Bounded Retries**: entities that stay incomplete are reset, purged,
//!   and retried up to a fixed pass count, then reported as terminal failures
//!
//! # Modules
//!
//! - [`exec`] - task runner adapter (external process or mock)
//! - [`verify`] - repo/solution verification against checklists + ledgers
//! - [`reset`] - checkbox reset and ledger purge between passes
//! - [`generate`] - one-time checklist generation from a repository list
//! - [`orchestrator`] - the retry state machine
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod exec;
pub mod generate;
pub mod orchestrator;
pub mod reset;
pub mod verify;

// Re-export commonly used types
pub use config::{Config, RunnerConfig};
pub use domain::{AttemptRecord, EntityState, SolutionInfo, VerificationResult, WorkflowSummary};
pub use exec::{CommandResult, ExecStatus, ProcessRunner, TaskRunner};
pub use generate::{ChecklistGenerator, GenerationReport};
pub use orchestrator::{Orchestrator, RunOptions};
pub use reset::ResetOperator;
pub use verify::{RepoVerifier, SolutionVerifier, alias_set, resolve_parent};
