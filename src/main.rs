//! credsift CLI — thin adapter over the scan orchestration layer
//!
//! Stands in for the editor host: loads settings, scans a file or uploads
//! a rules definition, and prints the resulting report as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use credsift::{
    AddRulesUseCase, Document, ScanDocumentUseCase, Settings, ShellTaskExecutor, init_tracing,
};

#[derive(Parser, Debug)]
#[command(name = "credsift", version, about = "Credential scanner orchestrator")]
struct Cli {
    /// Settings file (defaults to ./credsift.{toml,yaml,json})
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a file and print the diagnostics report
    Scan {
        /// File to scan
        file: PathBuf,
    },
    /// Upload a rules definition into the scanner backend
    AddRules {
        /// Rules file to upload
        rules: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    init_tracing(&settings.logging).map_err(|e| anyhow::anyhow!("failed to init tracing: {e}"))?;

    let executor = Arc::new(ShellTaskExecutor::new());

    match cli.command {
        Command::Scan { file } => {
            let path = file
                .canonicalize()
                .with_context(|| format!("cannot resolve {}", file.display()))?;
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;

            let use_case =
                ScanDocumentUseCase::new(settings.runner, settings.storage, executor);
            let report = use_case.execute(&Document::new(path, text)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::AddRules { rules } => {
            let use_case = AddRulesUseCase::new(settings.runner, executor);
            let added = use_case.execute(&rules).await?;
            if added {
                println!("rules added");
            } else {
                println!("rules were not added");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
