//! Discovery codec
//!
//! Normalizes the scanner's two output shapes — the CSV discoveries export
//! and the web service's JSON records — into [`Discovery`] values. Both
//! paths share one field mapping; they differ only in how tolerant they are
//! of absent rule detail.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Discovery, Rule};

/// Errors raised while decoding discovery records
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to read discoveries file: {path}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Non-numeric value for discovery field {field}: {value:?}")]
    NumericField { field: &'static str, value: String },
}

/// Wire representation of one discovery record.
///
/// Numeric fields arrive string-typed and rule detail uses a flat `rule_*`
/// naming convention; this shape exists only to be converted. Field order
/// matches the CSV export's column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDiscovery {
    pub id: String,
    pub file_name: String,
    pub commit_id: String,
    pub line_number: String,
    pub snippet: String,
    pub repo_url: String,
    #[serde(default)]
    pub rule_id: Option<String>,
    pub state: String,
    pub timestamp: String,
    #[serde(default)]
    pub rule_regex: Option<String>,
    #[serde(default)]
    pub rule_category: Option<String>,
    #[serde(default)]
    pub rule_description: Option<String>,
}

impl From<&Discovery> for RawDiscovery {
    fn from(discovery: &Discovery) -> Self {
        Self {
            id: discovery.id.to_string(),
            file_name: discovery.filename.clone(),
            commit_id: discovery.commit_id.clone(),
            line_number: discovery.line_number.to_string(),
            snippet: discovery.snippet.clone(),
            repo_url: discovery.repo_url.clone(),
            rule_id: Some(discovery.rule_id.to_string()),
            state: discovery.state.clone(),
            timestamp: discovery.timestamp.clone(),
            rule_regex: discovery.rule.as_ref().map(|rule| rule.regex.clone()),
            rule_category: discovery.rule.as_ref().map(|rule| rule.category.clone()),
            rule_description: discovery
                .rule
                .as_ref()
                .map(|rule| rule.description.clone()),
        }
    }
}

/// Convert one wire record into the typed model.
///
/// With `allow_missing_rule` (the JSON path, which may omit rule detail) a
/// record lacking essential rule fields yields `Ok(None)` instead of a
/// partially-populated discovery. The CSV path always carries the rule
/// columns, so there the rule is populated unconditionally.
///
/// Non-numeric `id`/`line_number`/`rule_id` values are an upstream-tool
/// bug and surface as a typed error rather than being coerced to zero.
pub fn discovery_from_raw(
    raw: &RawDiscovery,
    allow_missing_rule: bool,
) -> Result<Option<Discovery>, CodecError> {
    let rule = if allow_missing_rule {
        match (&raw.rule_id, &raw.rule_regex, &raw.rule_category) {
            (Some(rule_id), Some(regex), Some(category)) => Some(Rule {
                id: parse_numeric("rule_id", rule_id)?,
                regex: regex.clone(),
                category: category.clone(),
                description: raw.rule_description.clone().unwrap_or_default(),
            }),
            _ => {
                debug!(id = %raw.id, "dropping discovery record without rule detail");
                return Ok(None);
            }
        }
    } else {
        Some(Rule {
            id: parse_numeric("rule_id", raw.rule_id.as_deref().unwrap_or_default())?,
            regex: raw.rule_regex.clone().unwrap_or_default(),
            category: raw.rule_category.clone().unwrap_or_default(),
            description: raw.rule_description.clone().unwrap_or_default(),
        })
    };

    Ok(Some(Discovery {
        id: parse_numeric("id", &raw.id)?,
        filename: raw.file_name.clone(),
        commit_id: raw.commit_id.clone(),
        repo_url: raw.repo_url.clone(),
        line_number: parse_numeric("line_number", &raw.line_number)?,
        snippet: raw.snippet.clone(),
        rule_id: rule.as_ref().map(|rule| rule.id).unwrap_or_default(),
        rule,
        state: raw.state.clone(),
        timestamp: raw.timestamp.clone(),
    }))
}

/// Parse a header-driven CSV discoveries export, preserving file order.
///
/// Callers check for the file's existence first; rows are expected to be
/// well-formed, so row-level failures propagate instead of being dropped.
pub fn discoveries_from_csv(path: &Path) -> Result<Vec<Discovery>, CodecError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| CodecError::Csv {
            path: path.display().to_string(),
            source,
        })?;

    let mut discoveries = Vec::new();
    for record in reader.deserialize::<RawDiscovery>() {
        let raw = record.map_err(|source| CodecError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        if let Some(discovery) = discovery_from_raw(&raw, false)? {
            discoveries.push(discovery);
        }
    }

    debug!(
        path = %path.display(),
        count = discoveries.len(),
        "parsed discoveries export"
    );
    Ok(discoveries)
}

fn parse_numeric<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, CodecError> {
    value.parse().map_err(|_| CodecError::NumericField {
        field,
        value: value.to_string(),
    })
}
