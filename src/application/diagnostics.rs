//! Discovery → editor diagnostic mapping

use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

use crate::domain::{Discovery, Document};

/// Source tag attached to every published diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "credsift";

/// Map discoveries onto positional diagnostics against the live document
/// text.
///
/// The range covers the discovery's snippet within its source line,
/// falling back to column zero when the snippet no longer occurs on that
/// line (e.g. the document changed since the scan). Severity is always
/// Warning.
pub fn diagnostics_for_document(document: &Document, discoveries: &[Discovery]) -> Vec<Diagnostic> {
    discoveries
        .iter()
        .map(|discovery| {
            let line = discovery.line_number.saturating_sub(1);
            let line_text = document.line(discovery.line_number);

            let start_character = line_text
                .find(&discovery.snippet)
                .map(|byte_offset| utf16_len(&line_text[..byte_offset]))
                .unwrap_or(0);
            let end_character = start_character + utf16_len(&discovery.snippet);

            let (regex, category) = discovery
                .rule
                .as_ref()
                .map(|rule| (rule.regex.as_str(), rule.category.as_str()))
                .unwrap_or_default();

            Diagnostic {
                range: Range::new(
                    Position::new(line, start_character),
                    Position::new(line, end_character),
                ),
                severity: Some(DiagnosticSeverity::WARNING),
                code: Some(NumberOrString::String(discovery.rule_id.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format!(
                    "Credential detected: \"{}\" (rule: {regex}, category: {category})",
                    discovery.snippet
                ),
                ..Diagnostic::default()
            }
        })
        .collect()
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}
