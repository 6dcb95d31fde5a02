#![warn(missing_docs)]

//! Command-line entry point for the scrub-log analyzer.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::Parser;
use scrubline::{AnalyzerConfig, ScrubLogAnalyzer};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scrubline")]
#[command(about = "Reconstruct scrub schedules from osd tree, pg dump, and OSD logs", long_about = None)]
struct Cli {
    /// Combined input dump (osd tree + pg dump + OSD log excerpts).
    input: Option<PathBuf>,

    /// Optional TOML or JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore log lines at or before this instant
    /// (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`).
    #[arg(short, long, value_parser = parse_min_time)]
    min_time: Option<NaiveDateTime>,

    /// Estimated scrub throughput in bytes/sec.
    #[arg(short = 'r', long)]
    scrub_rate: Option<f64>,

    /// Warn about every line matching no recognized shape.
    #[arg(short = 'u', long)]
    log_unknown_lines: bool,
}

fn parse_min_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) if path.exists() => AnalyzerConfig::from_file(path)?,
        Some(path) => {
            tracing::warn!("Config file not found, using defaults: {}", path.display());
            AnalyzerConfig::default()
        }
        None => AnalyzerConfig::default(),
    };
    if let Some(input) = cli.input {
        config.input = input;
    }
    if let Some(min_time) = cli.min_time {
        config.min_time = Some(min_time);
    }
    if let Some(rate) = cli.scrub_rate {
        config.scrub_rate_bytes_per_sec = rate;
    }
    if cli.log_unknown_lines {
        config.log_unknown_lines = true;
    }

    tracing::info!(input = %config.input.display(), "scrubline starting");

    let file = File::open(&config.input)?;
    let reader = BufReader::new(file);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut analyzer = ScrubLogAnalyzer::new(config);
    analyzer.run(reader, &mut out)?;

    Ok(())
}
