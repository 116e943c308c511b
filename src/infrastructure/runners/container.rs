//! Containerized runner
//!
//! Same command vocabulary as the binary runner, but every filesystem path
//! is mediated through a fixed container-internal work dir, and every
//! operation is a `&&`-chained sequence of docker CLI steps so a failed
//! step aborts the remainder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::{ContainerConfig, ValidationError, validation::validate_rules_path};
use crate::domain::{CorrelationId, Discovery};
use crate::infrastructure::codec::discoveries_from_csv;
use crate::infrastructure::executor::CommandExecutor;

use super::{
    Runner, RunnerError, add_rules_command, discoveries_file_name, get_discoveries_command,
    remove_local_file, scan_command,
};

/// Scanner CLI entry point inside the container
const CONTAINER_TOOL: &str = "credentialdigger";

/// Fixed scratch directory inside the container
const CONTAINER_WORK_DIR: &str = "/tmp/credsift";

/// Shell convention for "command not found"; remapped so it cannot be
/// mistaken for a 127-discovery scan result.
const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Drives a scanner inside a running container through the docker CLI.
pub struct ContainerRunner {
    config: ContainerConfig,
    executor: Arc<dyn CommandExecutor>,
    correlation_id: CorrelationId,
    target: Option<PathBuf>,
    container_scan_path: Option<String>,
    container_discoveries_path: Option<String>,
    local_discoveries_file: Option<PathBuf>,
    rules_file: Option<PathBuf>,
}

impl ContainerRunner {
    pub fn new(config: ContainerConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            executor,
            correlation_id: CorrelationId::new(),
            target: None,
            container_scan_path: None,
            container_discoveries_path: None,
            local_discoveries_file: None,
            rules_file: None,
        }
    }

    fn container_path_for(&self, local: &Path) -> String {
        let file_name = local
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{CONTAINER_WORK_DIR}/{file_name}")
    }

    fn exec(&self, command: &str) -> String {
        format!("docker exec {} {command}", self.config.container_id)
    }

    fn copy_in(&self, local: &Path, container_path: &str) -> String {
        format!(
            "docker cp \"{}\" {}:\"{container_path}\"",
            local.display(),
            self.config.container_id
        )
    }

    fn copy_out(&self, container_path: &str, local: &Path) -> String {
        format!(
            "docker cp {}:\"{container_path}\" \"{}\"",
            self.config.container_id,
            local.display()
        )
    }

    /// Best-effort in-container removal; failures are logged, never raised.
    async fn remove_container_file(&self, container_path: &str) {
        let command = self.exec(&format!("rm -f \"{container_path}\""));
        match self.executor.execute(&command, &self.correlation_id).await {
            Ok(_) => {
                debug!(correlation_id = %self.correlation_id, container_path, "removed container artifact");
            }
            Err(error) => {
                warn!(
                    correlation_id = %self.correlation_id,
                    container_path,
                    error = %error,
                    "failed to remove container artifact"
                );
            }
        }
    }
}

#[async_trait]
impl Runner for ContainerRunner {
    fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    async fn scan(&mut self, target: &Path) -> Result<i32, RunnerError> {
        self.target = Some(target.to_path_buf());
        let container_target = self.container_path_for(target);

        let command = format!(
            "{} && {} && {}",
            self.exec(&format!("mkdir -p \"{CONTAINER_WORK_DIR}\"")),
            self.copy_in(target, &container_target),
            self.exec(&scan_command(
                CONTAINER_TOOL,
                &container_target,
                &self.config.database
            )),
        );
        self.container_scan_path = Some(container_target);

        let exit_code = self
            .executor
            .execute(&command, &self.correlation_id)
            .await?
            .unwrap_or(0);

        if exit_code == EXIT_COMMAND_NOT_FOUND {
            warn!(
                correlation_id = %self.correlation_id,
                container_id = %self.config.container_id,
                "scanner tool not found inside container"
            );
            return Ok(-EXIT_COMMAND_NOT_FOUND);
        }
        Ok(exit_code)
    }

    #[instrument(skip(self, storage_root), fields(correlation_id = %self.correlation_id))]
    async fn get_discoveries(
        &mut self,
        storage_root: &Path,
    ) -> Result<Vec<Discovery>, RunnerError> {
        let (Some(target), Some(container_target)) =
            (self.target.clone(), self.container_scan_path.clone())
        else {
            return Ok(Vec::new());
        };

        let file_name = discoveries_file_name(&target);
        let container_out = format!("{CONTAINER_WORK_DIR}/{file_name}");
        let local_out = storage_root.join(&file_name);
        self.container_discoveries_path = Some(container_out.clone());
        self.local_discoveries_file = Some(local_out.clone());

        // Copy-out only runs when the export succeeded.
        let command = format!(
            "{} && {}",
            self.exec(&get_discoveries_command(
                CONTAINER_TOOL,
                &container_target,
                &container_out,
                &self.config.database
            )),
            self.copy_out(&container_out, &local_out),
        );
        let exit_code = self.executor.execute(&command, &self.correlation_id).await?;

        // The exit code here reflects the shell chain, not a discovery
        // count, so only an exact zero means the export is readable.
        if exit_code == Some(0) {
            Ok(discoveries_from_csv(&local_out)?)
        } else {
            Ok(Vec::new())
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

        let container_rules = self.container_path_for(&rules_file);
        let command = format!(
            "{} && {} && {}",
            self.exec(&format!("mkdir -p \"{CONTAINER_WORK_DIR}\"")),
            self.copy_in(&rules_file, &container_rules),
            self.exec(&add_rules_command(
                CONTAINER_TOOL,
                &container_rules,
                &self.config.database
            )),
        );
        let exit_code = self.executor.execute(&command, &self.correlation_id).await?;
        Ok(exit_code == Some(0))
    }

    async fn cleanup(&mut self) {
        if let Some(container_scan_path) = self.container_scan_path.take() {
            self.remove_container_file(&container_scan_path).await;
        }
        if let Some(container_discoveries_path) = self.container_discoveries_path.take() {
            self.remove_container_file(&container_discoveries_path).await;
        }
        if let Some(local_discoveries_file) = self.local_discoveries_file.take() {
            remove_local_file(&local_discoveries_file, &self.correlation_id).await;
        }
    }
}
