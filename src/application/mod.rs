//! Application layer: orchestration use cases and diagnostic mapping

pub mod diagnostics;
pub mod use_cases;

pub use diagnostics::{DIAGNOSTIC_SOURCE, diagnostics_for_document};
pub use use_cases::{AddRulesUseCase, ScanDocumentUseCase, ScanError, ScanReport};
