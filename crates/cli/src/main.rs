use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use smsbook_core::TransactionId;
use smsbook_parser::{DuplicateDetector, EngineConfig, LedgerEntry, ParseReport, ParsingPipeline};

mod args;
mod render;

use args::{Cli, OutputFormat};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let pipeline = ParsingPipeline::from_config(&config).context("Failed to build parser")?;

    let text = read_input(cli.file.as_deref()).await?;
    let timeout = cli.timeout_ms.map(Duration::from_millis);
    let mut report = parse_with_timeout(Arc::new(pipeline), text, timeout).await?;

    let duplicates = match &cli.ledger {
        Some(path) => {
            let ledger = load_ledger(path).await?;
            let matches = DuplicateDetector::from_config(&config.dedup)
                .find_duplicates(&report.transactions, &ledger);
            tracing::info!("{} of {} look recorded already", matches.len(), report.transactions.len());
            report.deselect_duplicates(&matches);
            matches
        }
        None => Vec::new(),
    };

    for id in &cli.deselect {
        let id = TransactionId::from(id.as_str());
        if !report.selection.is_selected(&id) {
            tracing::warn!("--deselect {id}: not a selected transaction of this run");
        }
        report.selection.deselect(&id);
    }

    let out = match cli.format {
        OutputFormat::Table => render::table(&report, &duplicates, cli.selected_only),
        OutputFormat::Json => render::json(&report, &duplicates, cli.selected_only)?,
    };
    println!("{}", out.trim_end());
    Ok(())
}

/// An explicit path must exist; a missing default file means defaults.
fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Using config {}", path.display());
            EngineConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
        }
        _ => Ok(EngineConfig::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    let dirs = directories::BaseDirs::new()?;
    Some(dirs.config_dir().join("smsbook").join("config.toml"))
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

async fn load_ledger(path: &Path) -> Result<Vec<LedgerEntry>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read ledger {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid ledger {}", path.display()))
}

/// Runs the pipeline on a blocking worker. On timeout the partial run is dropped.
async fn parse_with_timeout(
    pipeline: Arc<ParsingPipeline>,
    text: String,
    timeout: Option<Duration>,
) -> Result<ParseReport> {
    let task = tokio::task::spawn_blocking(move || pipeline.try_parse(&text));
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| anyhow!("Parsing timed out after {} ms", limit.as_millis()))?,
        None => task.await,
    };
    let report = joined.context("Parser worker failed")??;
    Ok(report)
}
