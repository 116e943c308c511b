//! credsift — orchestration layer for external credential scanners
//!
//! Drives one of three scanner backends (local binary, container, web
//! service) behind a uniform async [`Runner`](infrastructure::Runner)
//! contract, normalizes the tool's CSV/JSON output into typed
//! [`Discovery`](domain::Discovery) records, and maps them onto positional
//! editor diagnostics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use credsift::{Document, ScanDocumentUseCase, Settings, ShellTaskExecutor};
//!
//! let settings = Settings::load(None)?;
//! let executor = Arc::new(ShellTaskExecutor::new());
//! let use_case = ScanDocumentUseCase::new(settings.runner, settings.storage, executor);
//! let report = use_case.execute(&Document::new("a.js", text)).await?;
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::{AddRulesUseCase, ScanDocumentUseCase, ScanError, ScanReport};
pub use config::{Settings, ValidationError};
pub use domain::{CorrelationId, Discovery, Document, Rule, RunnerKind};
pub use infrastructure::{CommandExecutor, Runner, ShellTaskExecutor, build_runner};
pub use logging::init_tracing;
