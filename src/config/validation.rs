//! Configuration validation
//!
//! Resolves the permissive wire-shaped settings into the strict runtime
//! configuration enums. Every failure carries a distinct, user-correctable
//! message; resolution runs before any external process is spawned.

use super::{
    BinaryConfig, BinarySettings, ContainerConfig, ContainerSettings, DatabaseConfig,
    DatabaseSettings, RunnerConfig, RunnerSettings, WebServiceConfig, WebServiceSettings,
};
use crate::domain::RunnerKind;

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Runner configuration error: {message}")]
    Runner { message: String },

    #[error("Database configuration error: {message}")]
    Database { message: String },

    #[error("Rules configuration error: {message}")]
    Rules { message: String },
}

impl ValidationError {
    pub fn runner(message: impl Into<String>) -> Self {
        Self::Runner {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn rules(message: impl Into<String>) -> Self {
        Self::Rules {
            message: message.into(),
        }
    }
}

impl RunnerSettings {
    /// Resolve into a validated [`RunnerConfig`].
    ///
    /// Exactly one payload section must match the declared kind; the web
    /// service section does its own checks and deliberately skips the
    /// database validation, since authentication is delegated to the
    /// remote service.
    pub fn resolve(&self) -> Result<RunnerConfig, ValidationError> {
        match self.kind {
            Some(RunnerKind::Binary) => self
                .binary
                .as_ref()
                .ok_or_else(|| ValidationError::runner("binary runner settings are missing"))?
                .resolve()
                .map(RunnerConfig::Binary),
            Some(RunnerKind::Container) => self
                .container
                .as_ref()
                .ok_or_else(|| ValidationError::runner("container runner settings are missing"))?
                .resolve()
                .map(RunnerConfig::Container),
            Some(RunnerKind::WebService) => self
                .webservice
                .as_ref()
                .ok_or_else(|| ValidationError::runner("web service runner settings are missing"))?
                .resolve()
                .map(RunnerConfig::WebService),
            None => Err(ValidationError::runner("no runner type is configured")),
        }
    }
}

impl BinarySettings {
    pub fn resolve(&self) -> Result<BinaryConfig, ValidationError> {
        let path = match &self.path {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => return Err(ValidationError::runner("binary runner path is not set")),
        };
        if !path.exists() {
            return Err(ValidationError::runner(format!(
                "binary runner path does not exist: {}",
                path.display()
            )));
        }
        let database = resolve_database(self.database.as_ref())?;
        Ok(BinaryConfig { path, database })
    }
}

impl ContainerSettings {
    pub fn resolve(&self) -> Result<ContainerConfig, ValidationError> {
        let container_id = match &self.container_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => return Err(ValidationError::runner("container id is not set")),
        };
        let database = resolve_database(self.database.as_ref())?;
        Ok(ContainerConfig {
            container_id,
            database,
        })
    }
}

impl WebServiceSettings {
    pub fn resolve(&self) -> Result<WebServiceConfig, ValidationError> {
        let host = match &self.host {
            Some(host) if !host.is_empty() => host.clone(),
            _ => return Err(ValidationError::runner("web service host is not set")),
        };
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(ValidationError::runner(format!(
                "web service host must start with http:// or https://, got: {host}"
            )));
        }
        if let Some(envfile) = &self.envfile {
            if !envfile.exists() {
                return Err(ValidationError::runner(format!(
                    "credentials file does not exist: {}",
                    envfile.display()
                )));
            }
        }
        Ok(WebServiceConfig {
            host: host.trim_end_matches('/').to_string(),
            envfile: self.envfile.clone(),
            certificate_validation: self.certificate_validation,
        })
    }
}

fn resolve_database(settings: Option<&DatabaseSettings>) -> Result<DatabaseConfig, ValidationError> {
    let settings =
        settings.ok_or_else(|| ValidationError::database("provide a valid database type"))?;
    match settings.kind.as_deref() {
        Some("sqlite") => {
            let filename = settings
                .sqlite
                .as_ref()
                .and_then(|sqlite| sqlite.filename.clone())
                .filter(|filename| !filename.is_empty())
                .ok_or_else(|| {
                    ValidationError::database("sqlite database filename is not set")
                })?;
            Ok(DatabaseConfig::Sqlite { filename })
        }
        // The env file is only required at add-rules time, never at scan time
        Some("postgres") => Ok(DatabaseConfig::Postgres {
            envfile: settings
                .postgres
                .as_ref()
                .and_then(|postgres| postgres.envfile.clone()),
        }),
        _ => Err(ValidationError::database("provide a valid database type")),
    }
}

/// Pre-flight check run before an add-rules operation.
///
/// The external tool authenticates its `add_rules` command to Postgres only
/// through a dotenv file, so that file must be configured up front.
pub fn validate_rules_path(
    rules_path: &std::path::Path,
    database: Option<&DatabaseConfig>,
) -> Result<(), ValidationError> {
    if rules_path.as_os_str().is_empty() {
        return Err(ValidationError::rules("rules file path is empty"));
    }
    if let Some(DatabaseConfig::Postgres { envfile: None }) = database {
        return Err(ValidationError::rules(
            "adding rules to a postgres database requires a configured env file",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqliteSettings;
    use std::path::Path;

    fn sqlite_database() -> DatabaseSettings {
        DatabaseSettings {
            kind: Some("sqlite".to_string()),
            sqlite: Some(SqliteSettings {
                filename: Some("data.db".to_string()),
            }),
            postgres: None,
        }
    }

    #[test]
    fn test_missing_runner_type() {
        let err = RunnerSettings::default().resolve().unwrap_err();
        assert!(err.to_string().contains("no runner type"));
    }

    #[test]
    fn test_binary_path_must_be_set() {
        let settings = BinarySettings {
            path: None,
            database: Some(sqlite_database()),
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("binary runner path is not set"));
    }

    #[test]
    fn test_binary_path_must_exist() {
        let settings = BinarySettings {
            path: Some("/nonexistent/scanner".into()),
            database: Some(sqlite_database()),
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_missing_database_type_message() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let settings = BinarySettings {
            path: Some(file.path().to_path_buf()),
            database: None,
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("provide a valid database type"));

        let settings = ContainerSettings {
            container_id: Some("scanner-1".to_string()),
            database: Some(DatabaseSettings {
                kind: Some("mysql".to_string()),
                ..Default::default()
            }),
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("provide a valid database type"));
    }

    #[test]
    fn test_sqlite_requires_filename() {
        let settings = ContainerSettings {
            container_id: Some("scanner-1".to_string()),
            database: Some(DatabaseSettings {
                kind: Some("sqlite".to_string()),
                ..Default::default()
            }),
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("sqlite database filename"));
    }

    #[test]
    fn test_postgres_env_file_not_required_at_scan_time() {
        let settings = ContainerSettings {
            container_id: Some("scanner-1".to_string()),
            database: Some(DatabaseSettings {
                kind: Some("postgres".to_string()),
                ..Default::default()
            }),
        };
        let config = settings.resolve().unwrap();
        assert_eq!(
            config.database,
            DatabaseConfig::Postgres { envfile: None }
        );
    }

    #[test]
    fn test_webservice_host_scheme() {
        let settings = WebServiceSettings {
            host: Some("scanner.internal:9090".to_string()),
            ..Default::default()
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[test]
    fn test_webservice_trims_trailing_slash() {
        let settings = WebServiceSettings {
            host: Some("https://scanner.internal/".to_string()),
            ..Default::default()
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.host, "https://scanner.internal");
    }

    #[test]
    fn test_webservice_missing_credentials_file() {
        let settings = WebServiceSettings {
            host: Some("https://scanner.internal".to_string()),
            envfile: Some("/nonexistent/.env".into()),
            certificate_validation: Some(true),
        };
        let err = settings.resolve().unwrap_err();
        assert!(err.to_string().contains("credentials file does not exist"));
    }

    #[test]
    fn test_rules_path_must_not_be_empty() {
        let err = validate_rules_path(Path::new(""), None).unwrap_err();
        assert!(err.to_string().contains("rules file path is empty"));
    }

    #[test]
    fn test_postgres_rules_require_env_file() {
        let database = DatabaseConfig::Postgres { envfile: None };
        let err = validate_rules_path(Path::new("rules.yml"), Some(&database)).unwrap_err();
        assert!(err.to_string().contains("env file"));

        let database = DatabaseConfig::Postgres {
            envfile: Some(".env".into()),
        };
        assert!(validate_rules_path(Path::new("rules.yml"), Some(&database)).is_ok());
    }
}
