//! Credential discovery domain entities

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Detection rule that matched a discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub regex: String,
    pub category: String,
    pub description: String,
}

/// One detected credential occurrence reported by the scanning tool.
///
/// Immutable value object: produced once per scan, converted into
/// diagnostics, then discarded. `rule_id == rule.id` holds whenever
/// `rule` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// Identifier assigned by the external tool
    pub id: i64,
    pub filename: String,
    /// Empty for working-tree scans
    pub commit_id: String,
    pub repo_url: String,
    /// 1-based line in the scanned file
    pub line_number: u32,
    /// Exact source substring containing the credential
    pub snippet: String,
    pub rule_id: i64,
    pub rule: Option<Rule>,
    /// Lifecycle tag; freshly scanned discoveries are always "new"
    pub state: String,
    /// ISO-8601 timestamp recorded by the external tool
    pub timestamp: String,
}

/// A document handed to the orchestrator for scanning.
///
/// Carries the live text alongside the on-disk path so diagnostic ranges
/// are computed against what the editor actually shows.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Returns the 1-based line `number`, or an empty string when the
    /// document is shorter than that.
    pub fn line(&self, number: u32) -> &str {
        let index = number.saturating_sub(1) as usize;
        self.text.lines().nth(index).unwrap_or("")
    }
}
