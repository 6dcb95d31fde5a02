use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Assumed deep-scrub throughput used to back-date start events, in bytes/sec.
pub const SCRUB_RATE_EST: f64 = 80e6;

/// Runtime configuration for a single analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Combined input dump: osd tree + pg dump + OSD log excerpts.
    pub input: PathBuf,
    /// Log lines at or before this instant are ignored. `None` disables the cutoff.
    pub min_time: Option<NaiveDateTime>,
    /// Estimated scrub throughput in bytes/sec.
    pub scrub_rate_bytes_per_sec: f64,
    /// Emit a warning for every line matching no recognized shape.
    pub log_unknown_lines: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("scrub-logs.txt"),
            min_time: None,
            scrub_rate_bytes_per_sec: SCRUB_RATE_EST,
            log_unknown_lines: false,
        }
    }
}

impl AnalyzerConfig {
    /// Loads a configuration from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: AnalyzerConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: AnalyzerConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }
}
