//! Configuration management
//!
//! Settings are deserialized permissively (mirroring the editor-settings
//! wire shape, where every section is optional) and then resolved into
//! strict runtime enums before a runner is ever constructed. All
//! user-facing configuration errors originate from that resolution step.

pub mod validation;

pub use validation::ValidationError;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::RunnerKind;

/// Root application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runner: RunnerSettings,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

impl Settings {
    /// Load settings from an optional file plus `CREDSIFT__`-prefixed
    /// environment variables (environment wins).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("credsift").required(false)),
        };

        let settings = builder
            .add_source(config::Environment::with_prefix("CREDSIFT").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Runner section as it appears on the wire: a declared kind plus one
/// payload section per kind, all optional until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    #[serde(rename = "type")]
    pub kind: Option<RunnerKind>,
    pub binary: Option<BinarySettings>,
    pub container: Option<ContainerSettings>,
    pub webservice: Option<WebServiceSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarySettings {
    /// Path to the scanner executable on the local filesystem
    pub path: Option<PathBuf>,
    pub database: Option<DatabaseSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Container name or id passed to `docker exec` / `docker cp`
    pub container_id: Option<String>,
    pub database: Option<DatabaseSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebServiceSettings {
    /// Base URL of the scanner web service
    pub host: Option<String>,
    /// Env file holding the service auth key; absent means insecure mode
    pub envfile: Option<PathBuf>,
    /// TLS certificate validation toggle; defaults to true with a logged
    /// warning when left unset
    pub certificate_validation: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sqlite: Option<SqliteSettings>,
    pub postgres: Option<PostgresSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteSettings {
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub envfile: Option<PathBuf>,
}

/// Validated runner configuration: exactly one variant is active, and the
/// variant payload is complete.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerConfig {
    Binary(BinaryConfig),
    Container(ContainerConfig),
    WebService(WebServiceConfig),
}

impl RunnerConfig {
    pub fn kind(&self) -> RunnerKind {
        match self {
            RunnerConfig::Binary(_) => RunnerKind::Binary,
            RunnerConfig::Container(_) => RunnerKind::Container,
            RunnerConfig::WebService(_) => RunnerKind::WebService,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryConfig {
    pub path: PathBuf,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerConfig {
    pub container_id: String,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebServiceConfig {
    pub host: String,
    pub envfile: Option<PathBuf>,
    /// Kept as declared so the client builder can warn when it is unset
    pub certificate_validation: Option<bool>,
}

/// Validated database configuration for the CLI-driven backends
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    Sqlite { filename: String },
    Postgres { envfile: Option<PathBuf> },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Local storage for scan artifacts (discoveries exports)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved artifact root, defaulting to a crate-named directory under
    /// the system temp dir.
    pub fn resolve(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("credsift"))
    }
}
