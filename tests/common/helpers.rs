//! Test helper doubles for credsift

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use credsift::domain::CorrelationId;
use credsift::infrastructure::executor::{CommandExecutor, ExecutorError};

/// Scripted command executor: records every submitted command and replays
/// pre-seeded exit codes in order.
pub struct FakeExecutor {
    recorded: Mutex<Vec<String>>,
    exit_codes: Mutex<VecDeque<Option<i32>>>,
}

impl FakeExecutor {
    pub fn new(exit_codes: Vec<Option<i32>>) -> Self {
        Self {
            recorded: Mutex::new(Vec::new()),
            exit_codes: Mutex::new(exit_codes.into()),
        }
    }

    pub async fn recorded_commands(&self) -> Vec<String> {
        self.recorded.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.recorded.lock().await.len()
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn execute(
        &self,
        command: &str,
        _correlation_id: &CorrelationId,
    ) -> Result<Option<i32>, ExecutorError> {
        self.recorded.lock().await.push(command.to_string());
        Ok(self.exit_codes.lock().await.pop_front().unwrap_or(Some(0)))
    }
}
