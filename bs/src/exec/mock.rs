//! Mock task runner
//!
//! Drives the retry state machine deterministically in tests without
//! spawning processes. A handler closure receives the 0-based call index,
//! the operation name, and the parameters, and returns the scripted
//! [`CommandResult`]; side effects (marking checkboxes, appending ledger
//! rows) happen inside the closure the way the real runner would mutate the
//! tracking files.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CommandResult, TaskRunner};

type Handler = Box<dyn Fn(usize, &str, &[(String, String)]) -> CommandResult + Send + Sync>;

/// Scripted stand-in for the external task runner
pub struct MockRunner {
    handler: Handler,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockRunner {
    /// Create a mock whose outcomes come from the given handler
    pub fn with_handler(
        handler: impl Fn(usize, &str, &[(String, String)]) -> CommandResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock that reports success without doing anything
    pub fn always_succeed() -> Self {
        Self::with_handler(|_, _, _| CommandResult::success("", ""))
    }

    /// Mock that always fails with the given exit code
    pub fn always_fail(exit_code: i32) -> Self {
        Self::with_handler(move |_, operation, _| {
            CommandResult::fail(exit_code, format!("{} failed with exit code {}", operation, exit_code))
        })
    }

    /// Number of invocations so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock").len()
    }

    /// Recorded invocations: (operation, params)
    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().expect("mock calls lock").clone()
    }
}

#[async_trait]
impl TaskRunner for MockRunner {
    async fn run(&self, operation: &str, params: &[(String, String)]) -> CommandResult {
        let index = {
            let mut calls = self.calls.lock().expect("mock calls lock");
            calls.push((operation.to_string(), params.to_vec()));
            calls.len() - 1
        };
        (self.handler)(index, operation, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExecStatus;

    #[tokio::test]
    async fn test_mock_records_calls_in_order() {
        let mock = MockRunner::always_succeed();

        mock.run("execute-repo-task", &[("repo_checklist".to_string(), "a.md".to_string())])
            .await;
        mock.run("execute-solution-task", &[]).await;

        assert_eq!(mock.call_count(), 2);
        let calls = mock.calls();
        assert_eq!(calls[0].0, "execute-repo-task");
        assert_eq!(calls[1].0, "execute-solution-task");
    }

    #[tokio::test]
    async fn test_mock_handler_sees_call_index() {
        let mock = MockRunner::with_handler(|index, _, _| {
            if index == 0 {
                CommandResult::fail(1, "first call fails")
            } else {
                CommandResult::success("", "")
            }
        });

        assert_eq!(mock.run("op", &[]).await.status, ExecStatus::Fail);
        assert_eq!(mock.run("op", &[]).await.status, ExecStatus::Success);
    }
}
