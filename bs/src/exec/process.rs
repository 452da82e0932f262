//! External process task runner

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RunnerConfig;

use super::{CommandResult, ExecError, ExecStatus, TaskRunner};

/// Runs task operations through the configured external command.
///
/// The command line mirrors the runner's prompt invocation convention:
///
/// ```text
/// <command> --prompt "/<operation> key=\"value\" ..." [--allow-all-tools]
/// ```
pub struct ProcessRunner {
    command: String,
    allow_all_tools: bool,
    timeout: Duration,
    working_dir: PathBuf,
}

impl ProcessRunner {
    /// Create a runner from configuration, executing in the given directory
    pub fn new(config: &RunnerConfig, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: config.command.clone(),
            allow_all_tools: config.allow_all_tools,
            timeout: Duration::from_millis(config.timeout_ms),
            working_dir: working_dir.into(),
        }
    }

    /// Build the full shell command line for an operation
    pub fn build_command(&self, operation: &str, params: &[(String, String)]) -> String {
        let mut prompt = format!("/{}", operation);
        for (key, value) in params {
            prompt.push_str(&format!(" {}=\\\"{}\\\"", key, value));
        }

        let mut command = format!("{} --prompt \"{}\"", self.command, prompt);
        if self.allow_all_tools {
            command.push_str(" --allow-all-tools");
        }
        command
    }

    async fn launch(&self, command: &str) -> Result<std::process::Output, ExecError> {
        match tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&self.working_dir)
                .output(),
        )
        .await
        {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ExecError::Launch(e)),
            Err(_) => Err(ExecError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl TaskRunner for ProcessRunner {
    async fn run(&self, operation: &str, params: &[(String, String)]) -> CommandResult {
        let command = self.build_command(operation, params);
        debug!(%operation, %command, "ProcessRunner::run: executing");

        let output = match self.launch(&command).await {
            Ok(output) => output,
            Err(e) => {
                warn!(%operation, error = %e, "ProcessRunner::run: invocation did not complete");
                return CommandResult::fail(-1, format!("{}: {}", operation, e));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if output.status.success() {
            debug!(%operation, "ProcessRunner::run: command succeeded");
            CommandResult {
                status: ExecStatus::Success,
                exit_code,
                stdout,
                stderr,
                error_message: None,
            }
        } else {
            debug!(%operation, exit_code, "ProcessRunner::run: command failed");
            CommandResult {
                status: ExecStatus::Fail,
                exit_code,
                stdout,
                stderr,
                error_message: Some(format!("{} failed with exit code {}", operation, exit_code)),
            }
        }
    }
}
