//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `domain_drop` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Reading the domain list and writing the report
//!
//! All core functionality is implemented in the library crate.

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use domain_drop::export::export_report;
use domain_drop::initialization::init_logger_with;
use domain_drop::{analyze_batch, cancel_on_ctrl_c, BatchRequest, Config};

/// Reads one domain per line, skipping blank lines and `#` comments.
async fn read_domain_lines<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<String>> {
    let mut lines = BufReader::new(reader).lines();
    let mut domains = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        domains.push(trimmed.to_string());
    }
    Ok(domains)
}

async fn read_domains(path: &Path) -> Result<Vec<String>> {
    if path.as_os_str() == "-" {
        log::info!("Reading domains from stdin");
        read_domain_lines(tokio::io::stdin()).await
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        let domains = read_domain_lines(file).await?;
        log::info!("Total domains in file: {}", domains.len());
        Ok(domains)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may hold OPENROUTER_API_KEY; a missing file is fine
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    let domains = match read_domains(&config.file).await {
        Ok(domains) => domains,
        Err(e) => {
            eprintln!("domain_drop error: {:#}", e);
            process::exit(1);
        }
    };

    let request = BatchRequest {
        domains,
        enrich: config.enrich,
        criteria: config.filter.to_criteria(),
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());

    let outcome = match analyze_batch(&config, request, cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("domain_drop error: {:#}", e);
            process::exit(1);
        }
    };
    ctrl_c.abort();

    let table = outcome.report.table();
    if let Err(e) = export_report(&table, config.format, config.output.as_deref()) {
        eprintln!("domain_drop error: {:#}", e);
        process::exit(1);
    }

    let summary = &outcome.report.summary;
    eprintln!(
        "✅ Analyzed {} domain{} ({} succeeded, {} partial, {} failed) in {:.1}s - {} {} report row{}",
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.succeeded,
        summary.partial,
        summary.failed,
        outcome.elapsed_seconds,
        summary.included,
        outcome.report.kind.as_str(),
        if summary.included == 1 { "" } else { "s" },
    );
    if let Some(path) = &config.output {
        eprintln!("Report written to {}", path.display());
    }
    Ok(())
}
