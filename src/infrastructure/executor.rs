//! Shell task execution with per-invocation completion correlation
//!
//! Scanner backends submit whole shell commands here. Each submission gets
//! a unique numeric task id; completion events from every in-flight task
//! flow through one channel into a dispatcher that resolves the matching
//! pending future. Concurrent scans of different documents therefore never
//! cross-resolve each other's submissions, even when the command strings
//! are identical.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::CorrelationId;

/// Errors raised while submitting or supervising a shell task
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Failed to submit shell task: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("Task completion dispatcher is no longer running")]
    Dispatcher,
}

/// Command execution seam for the runner backends.
///
/// Resolves with the raw exit code once that specific invocation
/// terminates; `None` means the exit status could not be observed and
/// callers must treat it as failure, never as success.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        command: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Option<i32>, ExecutorError>;
}

struct TaskCompletion {
    task_id: u64,
    exit_code: Option<i32>,
}

/// Executes shell commands in the background and correlates completions.
///
/// One dispatcher task owns the completion stream; pending submissions are
/// oneshot senders keyed by task id, removed the moment they resolve so the
/// map never leaks finished entries.
pub struct ShellTaskExecutor {
    next_task_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Option<i32>>>>>,
    completions: mpsc::UnboundedSender<TaskCompletion>,
}

impl ShellTaskExecutor {
    /// Create the executor and spawn its dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        let (completions, mut receiver) = mpsc::unbounded_channel::<TaskCompletion>();
        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Option<i32>>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let dispatch_map = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(completion) = receiver.recv().await {
                let sender = dispatch_map.lock().await.remove(&completion.task_id);
                match sender {
                    Some(sender) => {
                        let _ = sender.send(completion.exit_code);
                    }
                    None => {
                        warn!(
                            task_id = completion.task_id,
                            "completion event for unknown task"
                        );
                    }
                }
            }
        });

        Self {
            next_task_id: AtomicU64::new(1),
            pending,
            completions,
        }
    }
}

impl Default for ShellTaskExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ShellTaskExecutor {
    async fn execute(
        &self,
        command: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Option<i32>, ExecutorError> {
        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);

        // Submission failures surface immediately; only a spawned child is
        // ever registered as pending.
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecutorError::Spawn { source })?;

        let (resolved_tx, resolved_rx) = oneshot::channel();
        self.pending.lock().await.insert(task_id, resolved_tx);

        debug!(
            correlation_id = %correlation_id,
            task_id,
            command,
            "submitted shell task"
        );

        let completions = self.completions.clone();
        let supervisor_correlation_id = correlation_id.clone();
        tokio::spawn(async move {
            let exit_code = match child.wait().await {
                Ok(status) => status.code(),
                Err(error) => {
                    warn!(
                        correlation_id = %supervisor_correlation_id,
                        task_id,
                        error = %error,
                        "failed to observe task exit status"
                    );
                    None
                }
            };
            let _ = completions.send(TaskCompletion { task_id, exit_code });
        });

        resolved_rx.await.map_err(|_| ExecutorError::Dispatcher)
    }
}
