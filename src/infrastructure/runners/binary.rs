//! Local binary runner

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::{BinaryConfig, ValidationError, validation::validate_rules_path};
use crate::domain::{CorrelationId, Discovery};
use crate::infrastructure::codec::discoveries_from_csv;
use crate::infrastructure::executor::CommandExecutor;

use super::{
    Runner, RunnerError, add_rules_command, discoveries_file_name, get_discoveries_command,
    remove_local_file, scan_command,
};

/// Drives a locally installed scanner binary through shell tasks.
pub struct BinaryRunner {
    config: BinaryConfig,
    executor: Arc<dyn CommandExecutor>,
    correlation_id: CorrelationId,
    target: Option<PathBuf>,
    discoveries_file: Option<PathBuf>,
    rules_file: Option<PathBuf>,
}

impl BinaryRunner {
    pub fn new(config: BinaryConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            executor,
            correlation_id: CorrelationId::new(),
            target: None,
            discoveries_file: None,
            rules_file: None,
        }
    }

    fn tool(&self) -> String {
        self.config.path.display().to_string()
    }
}

#[async_trait]
impl Runner for BinaryRunner {
    fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    async fn scan(&mut self, target: &Path) -> Result<i32, RunnerError> {
        self.target = Some(target.to_path_buf());

        let command = scan_command(&self.tool(), &target.to_string_lossy(), &self.config.database);
        let exit_code = self.executor.execute(&command, &self.correlation_id).await?;

        // scan_path reports the discovery count through its exit code
        Ok(exit_code.unwrap_or(0))
    }

    #[instrument(skip(self, storage_root), fields(correlation_id = %self.correlation_id))]
    async fn get_discoveries(
        &mut self,
        storage_root: &Path,
    ) -> Result<Vec<Discovery>, RunnerError> {
        let Some(target) = self.target.clone() else {
            return Ok(Vec::new());
        };

        let save_path = storage_root.join(discoveries_file_name(&target));
        self.discoveries_file = Some(save_path.clone());

        let command = get_discoveries_command(
            &self.tool(),
            &target.to_string_lossy(),
            &save_path.to_string_lossy(),
            &self.config.database,
        );
        let exit_code = self.executor.execute(&command, &self.correlation_id).await?;

        // A zero or unobserved exit code means no discoveries were
        // exported, so there is no file to parse.
        match exit_code {
            Some(code) if code > 0 => {
                debug!(
                    correlation_id = %self.correlation_id,
                    count = code,
                    save_path = %save_path.display(),
                    "parsing discoveries export"
                );
                Ok(discoveries_from_csv(&save_path)?)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn validate_and_set_rules(&mut self, rules_file: &Path) -> Result<(), ValidationError> {
        validate_rules_path(rules_file, Some(&self.config.database))?;
        self.rules_file = Some(rules_file.to_path_buf());
        Ok(())
    }

    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    async fn add_rules(&mut self) -> Result<bool, RunnerError> {
        let Some(rules_file) = self.rules_file.clone() else {
            return Ok(false);
        };

        let command = add_rules_command(
            &self.tool(),
            &rules_file.to_string_lossy(),
            &self.config.database,
        );
        let exit_code = self.executor.execute(&command, &self.correlation_id).await?;
        Ok(exit_code == Some(0))
    }

    async fn cleanup(&mut self) {
        if let Some(discoveries_file) = self.discoveries_file.take() {
            remove_local_file(&discoveries_file, &self.correlation_id).await;
        }
    }
}
