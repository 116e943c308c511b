//! Web service runner
//!
//! Talks HTTP to a remote scanner instead of spawning processes. The only
//! backend with a persistent network client: a cookie jar preserves the
//! login session across requests, and redirect following is disabled
//! because this service signals authentication success with a redirect
//! response rather than a 2xx status.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};

use crate::config::{ValidationError, WebServiceConfig, validation::validate_rules_path};
use crate::domain::{CorrelationId, Discovery};
use crate::infrastructure::codec::{RawDiscovery, discovery_from_raw};

use super::{FactoryError, Runner, RunnerError, SCAN_MODELS};

/// Client-side timeout applied to every request
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Variable looked up in the configured credentials env file
const AUTH_KEY_VAR: &str = "AUTH_KEY";

/// Drives a remote scanner web service over HTTP.
pub struct WebServiceRunner {
    config: WebServiceConfig,
    client: reqwest::Client,
    auth_key: Option<String>,
    correlation_id: CorrelationId,
    target: Option<PathBuf>,
    discoveries: Vec<Discovery>,
    rules_file: Option<PathBuf>,
}

impl WebServiceRunner {
    pub fn new(config: WebServiceConfig) -> Result<Self, FactoryError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(Policy::none())
            .cookie_store(true);

        if config.host.starts_with("https://") {
            let validate_certificates = match config.certificate_validation {
                Some(validate) => validate,
                None => {
                    warn!(
                        host = %config.host,
                        "certificate validation flag is unset, defaulting to enabled"
                    );
                    true
                }
            };
            if !validate_certificates {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }
        let client = builder.build()?;

        let auth_key = match &config.envfile {
            Some(envfile) => read_auth_key(envfile)?,
            None => None,
        };

        Ok(Self {
            config,
            client,
            auth_key,
            correlation_id: CorrelationId::new(),
            target: None,
            discoveries: Vec::new(),
            rules_file: None,
        })
    }

    /// Establish the login session when credentials are configured.
    ///
    /// The service answers a successful login with a redirect; any other
    /// status is a hard failure carrying that status. Without credentials
    /// this is a no-op (insecure mode).
    async fn connect(&self) -> Result<(), RunnerError> {
        let Some(auth_key) = &self.auth_key else {
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/login", self.config.host))
            .form(&[("auth_key", auth_key.as_str())])
            .send()
            .await?;

        if response.status().is_redirection() {
            debug!(correlation_id = %self.correlation_id, host = %self.config.host, "session established");
            Ok(())
        } else {
            Err(RunnerError::Authentication {
                host: self.config.host.clone(),
                status: response.status(),
            })
        }
    }

    async fn file_part(&self, path: &Path) -> Result<Part, RunnerError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| RunnerError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Part::bytes(bytes).file_name(file_name))
    }
}

fn read_auth_key(envfile: &Path) -> Result<Option<String>, FactoryError> {
    let entries = dotenvy::from_path_iter(envfile).map_err(|source| FactoryError::Credentials {
        path: envfile.display().to_string(),
        source,
    })?;
    for entry in entries {
        let (key, value) = entry.map_err(|source| FactoryError::Credentials {
            path: envfile.display().to_string(),
            source,
        })?;
        if key == AUTH_KEY_VAR {
            return Ok(Some(value));
        }
    }
    warn!(
        envfile = %envfile.display(),
        "credentials file does not define {AUTH_KEY_VAR}, running unauthenticated"
    );
    Ok(None)
}

#[async_trait]
impl Runner for WebServiceRunner {
    fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    async fn scan(&mut self, target: &Path) -> Result<i32, RunnerError> {
        self.connect().await?;

        let form = Form::new()
            .text("pathModel", SCAN_MODELS[0])
            .text("passwordModel", SCAN_MODELS[1])
            .text("rule_to_use", "all")
            .text("forceScan", "force")
            .part("filename", self.file_part(target).await?);

        let response = self
            .client
            .post(format!("{}/scan_file", self.config.host))
            .multipart(form)
            .send()
            .await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);

        if response.status() != reqwest::StatusCode::OK || !is_json {
            return Err(RunnerError::ScanRejected {
                file: target.display().to_string(),
                host: self.config.host.clone(),
                status: response.status(),
            });
        }

        let raw_discoveries: Vec<RawDiscovery> = response.json().await?;
        // Records without rule detail (or with garbage numerics) are
        // dropped rather than failing the whole scan.
        self.discoveries = raw_discoveries
            .iter()
            .filter_map(|raw| discovery_from_raw(raw, true).ok().flatten())
            .collect();
        self.target = Some(target.to_path_buf());

        debug!(
            correlation_id = %self.correlation_id,
            count = self.discoveries.len(),
            "scan accepted by web service"
        );
        Ok(self.discoveries.len() as i32)
    }

    /// No server round-trip: returns the list cached by the most recent
    /// [`Runner::scan`] call.
    async fn get_discoveries(
        &mut self,
        _storage_root: &Path,
    ) -> Result<Vec<Discovery>, RunnerError> {
        if self.target.is_none() {
            return Ok(Vec::new());
        }
        Ok(self.discoveries.clone())
    }

    fn validate_and_set_rules(&mut self, rules_file: &Path) -> Result<(), ValidationError> {
        // Authentication is the remote service's concern, so there is no
        // database requirement to enforce here.
        validate_rules_path(rules_file, None)?;
        self.rules_file = Some(rules_file.to_path_buf());
        Ok(())
    }

    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    async fn add_rules(&mut self) -> Result<bool, RunnerError> {
        let Some(rules_file) = self.rules_file.clone() else {
            return Ok(false);
        };

        self.connect().await?;

        let form = Form::new().part("filename", self.file_part(&rules_file).await?);
        let response = self
            .client
            .post(format!("{}/upload_rule", self.config.host))
            .multipart(form)
            .send()
            .await?;

        // Same redirect-as-success convention as login; a completed call
        // that never reaches the redirect outcome is a plain false.
        Ok(response.status().is_redirection())
    }

    /// This backend owns no local or remote scratch artifacts.
    async fn cleanup(&mut self) {}
}
