//! Scanner runner backends
//!
//! One uniform async contract over three execution strategies: a local
//! binary driven through shell tasks, a containerized binary reached via
//! the docker CLI, and a remote web service. The factory resolves the
//! wire-shaped settings into a validated configuration and constructs the
//! matching backend; validation always happens before anything external
//! is touched.

mod binary;
mod container;
mod webservice;

pub use binary::BinaryRunner;
pub use container::ContainerRunner;
pub use webservice::WebServiceRunner;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::{DatabaseConfig, RunnerConfig, RunnerSettings, ValidationError};
use crate::domain::{CorrelationId, Discovery};
use crate::infrastructure::codec::CodecError;
use crate::infrastructure::executor::{CommandExecutor, ExecutorError};

/// Detection models requested on every scan
pub(crate) const SCAN_MODELS: [&str; 2] = ["PathModel", "PasswordModel"];

/// Errors raised by runner operations after construction
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Task execution failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Failed to decode discoveries: {0}")]
    Codec(#[from] CodecError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication to {host} failed with status {status}")]
    Authentication {
        host: String,
        status: reqwest::StatusCode,
    },

    #[error("Scan of {file} was rejected by {host} (status {status})")]
    ScanRejected {
        file: String,
        host: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while constructing a runner
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to read credentials file {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
}

/// Uniform contract over the three scanner backends.
///
/// One instance serves one orchestrated scan (or one add-rules call):
/// `scan` → `get_discoveries` → `cleanup`, strictly in that order, with
/// `cleanup` safe to call regardless of how far the sequence got.
#[async_trait]
pub trait Runner: Send {
    /// Correlation id tagging every log line and submitted task
    fn correlation_id(&self) -> &CorrelationId;

    /// Trigger the external tool against `target`.
    ///
    /// The returned exit code is the tool's discovery count on the success
    /// path; negative values are failure sentinels.
    async fn scan(&mut self, target: &Path) -> Result<i32, RunnerError>;

    /// Retrieve and decode the results of the most recent scan.
    ///
    /// Returns an empty list without touching the executor when no scan
    /// target was ever set.
    async fn get_discoveries(&mut self, storage_root: &Path)
        -> Result<Vec<Discovery>, RunnerError>;

    /// Validate and record the rules file for a later [`Runner::add_rules`].
    fn validate_and_set_rules(&mut self, rules_file: &Path) -> Result<(), ValidationError>;

    /// Upload/merge the recorded rules file into the tool's configuration.
    ///
    /// Returns `false` (not an error) when rules were never set.
    async fn add_rules(&mut self) -> Result<bool, RunnerError>;

    /// Best-effort removal of any artifacts created by earlier calls.
    /// Idempotent and tolerant of artifacts that were never created.
    async fn cleanup(&mut self);
}

/// Construct the runner matching the declared backend kind.
pub fn build_runner(
    settings: &RunnerSettings,
    executor: Arc<dyn CommandExecutor>,
) -> Result<Box<dyn Runner>, FactoryError> {
    match settings.resolve()? {
        RunnerConfig::Binary(config) => Ok(Box::new(BinaryRunner::new(config, executor))),
        RunnerConfig::Container(config) => Ok(Box::new(ContainerRunner::new(config, executor))),
        RunnerConfig::WebService(config) => Ok(Box::new(WebServiceRunner::new(config)?)),
    }
}

/// Deterministic local output filename for a scan target: the first eight
/// hex characters of the sha256 of the absolute target path, suffixed
/// `.csv`. Per-target derivation keeps concurrent scans from sharing
/// artifact paths.
pub(crate) fn discoveries_file_name(target: &Path) -> String {
    let digest = hex::encode(Sha256::digest(target.to_string_lossy().as_bytes()));
    format!("{}.csv", &digest[..8])
}

/// `scan_path` command for the CLI-driven backends. The `--sqlite` flag is
/// appended only for SQLite; Postgres credentials travel via the tool's
/// environment, never on this call.
pub(crate) fn scan_command(tool: &str, target: &str, database: &DatabaseConfig) -> String {
    let mut command = format!(
        "{tool} scan_path \"{target}\" --models {} {} --force --debug",
        SCAN_MODELS[0], SCAN_MODELS[1]
    );
    if let DatabaseConfig::Sqlite { filename } = database {
        command.push_str(&format!(" --sqlite \"{filename}\""));
    }
    command
}

/// `get_discoveries` command writing the CSV export to `save_path`.
pub(crate) fn get_discoveries_command(
    tool: &str,
    target: &str,
    save_path: &str,
    database: &DatabaseConfig,
) -> String {
    let mut command =
        format!("{tool} get_discoveries --with_rules --save \"{save_path}\" \"{target}\"");
    if let DatabaseConfig::Sqlite { filename } = database {
        command.push_str(&format!(" --sqlite \"{filename}\""));
    }
    command
}

/// `add_rules` command; the database flag picks `--sqlite` or `--dotenv`
/// depending on the configured backend.
pub(crate) fn add_rules_command(tool: &str, rules_file: &str, database: &DatabaseConfig) -> String {
    let mut command = format!("{tool} add_rules \"{rules_file}\"");
    match database {
        DatabaseConfig::Sqlite { filename } => {
            command.push_str(&format!(" --sqlite \"{filename}\""));
        }
        DatabaseConfig::Postgres {
            envfile: Some(envfile),
        } => {
            command.push_str(&format!(" --dotenv \"{}\"", envfile.display()));
        }
        DatabaseConfig::Postgres { envfile: None } => {}
    }
    command
}

/// Remove a local artifact, tolerating files that were never created.
pub(crate) async fn remove_local_file(path: &Path, correlation_id: &CorrelationId) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(correlation_id = %correlation_id, path = %path.display(), "removed artifact"),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => warn!(
            correlation_id = %correlation_id,
            path = %path.display(),
            error = %error,
            "failed to remove artifact"
        ),
    }
}
