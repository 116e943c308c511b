//! Orchestration use cases
//!
//! Drives the scan → fetch → annotate → cleanup sequence over a freshly
//! built runner. Operations on one runner are strictly sequential; each
//! use-case invocation constructs its own runner, so concurrent scans of
//! different documents interleave freely.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::application::diagnostics::diagnostics_for_document;
use crate::config::{RunnerSettings, StorageConfig, ValidationError};
use crate::domain::{Discovery, Document};
use crate::infrastructure::executor::CommandExecutor;
use crate::infrastructure::runners::{FactoryError, Runner, RunnerError, build_runner};

/// Errors surfaced by the orchestration layer
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Rules(#[from] ValidationError),

    #[error("Scanner backend reported failure (exit code {exit_code})")]
    Backend { exit_code: i32 },

    #[error("Failed to prepare storage directory {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result summary of one orchestrated scan
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub target: PathBuf,
    pub discovery_count: usize,
    pub duration_ms: u64,
    pub diagnostics: Vec<lsp_types::Diagnostic>,
}

/// Scans one document and maps the discoveries onto editor diagnostics.
pub struct ScanDocumentUseCase {
    settings: RunnerSettings,
    storage: StorageConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl ScanDocumentUseCase {
    pub fn new(
        settings: RunnerSettings,
        storage: StorageConfig,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            settings,
            storage,
            executor,
        }
    }

    #[instrument(skip(self, document), fields(target = %document.path.display()))]
    pub async fn execute(&self, document: &Document) -> Result<ScanReport, ScanError> {
        let started = Instant::now();

        let mut runner = build_runner(&self.settings, Arc::clone(&self.executor))?;
        let correlation_id = runner.correlation_id().clone();
        info!(correlation_id = %correlation_id, "starting credential scan");

        let outcome = self.run_scan(runner.as_mut(), document).await;
        // Cleanup is terminal and must run even after a partial failure.
        runner.cleanup().await;

        let discoveries = match outcome {
            Ok(discoveries) => discoveries,
            Err(scan_error) => {
                error!(correlation_id = %correlation_id, error = %scan_error, "scan failed");
                return Err(scan_error);
            }
        };

        let diagnostics = diagnostics_for_document(document, &discoveries);
        info!(
            correlation_id = %correlation_id,
            discoveries = discoveries.len(),
            "scan finished"
        );

        Ok(ScanReport {
            target: document.path.clone(),
            discovery_count: discoveries.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            diagnostics,
        })
    }

    async fn run_scan(
        &self,
        runner: &mut dyn Runner,
        document: &Document,
    ) -> Result<Vec<Discovery>, ScanError> {
        let exit_code = runner.scan(&document.path).await?;
        if exit_code < 0 {
            return Err(ScanError::Backend { exit_code });
        }

        let storage_root = self.storage.resolve();
        tokio::fs::create_dir_all(&storage_root)
            .await
            .map_err(|source| ScanError::Storage {
                path: storage_root.display().to_string(),
                source,
            })?;

        Ok(runner.get_discoveries(&storage_root).await?)
    }
}

/// Uploads a rules definition into the configured scanner backend.
pub struct AddRulesUseCase {
    settings: RunnerSettings,
    executor: Arc<dyn CommandExecutor>,
}

impl AddRulesUseCase {
    pub fn new(settings: RunnerSettings, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { settings, executor }
    }

    #[instrument(skip(self), fields(rules = %rules_file.display()))]
    pub async fn execute(&self, rules_file: &std::path::Path) -> Result<bool, ScanError> {
        let mut runner = build_runner(&self.settings, Arc::clone(&self.executor))?;
        let correlation_id = runner.correlation_id().clone();

        runner.validate_and_set_rules(rules_file)?;
        let outcome = runner.add_rules().await;
        runner.cleanup().await;

        let added = outcome?;
        info!(correlation_id = %correlation_id, added, "add rules finished");
        Ok(added)
    }
}
