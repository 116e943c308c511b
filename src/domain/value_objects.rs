//! Domain value objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend selection for the scanner runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    /// Local scanner binary invoked through shell tasks
    Binary,
    /// Scanner inside a container, reached through the docker CLI
    Container,
    /// Remote scanner web service with session-cookie auth
    WebService,
}

impl std::fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerKind::Binary => write!(f, "binary"),
            RunnerKind::Container => write!(f, "container"),
            RunnerKind::WebService => write!(f, "webservice"),
        }
    }
}

/// Identifier assigned once per runner instance.
///
/// Tags every log line and every submitted task so that concurrent scans
/// can be told apart in logs and in task-completion matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
