use anyhow::{Context, Result};
use std::process::Command;
use tracing::debug;

use super::{MediaInfo, MediaLookup};

/// yt-dlp backed lookup.
///
/// Runs the binary synchronously and parses `--dump-single-json`; meant to be
/// called from `spawn_blocking`.
pub struct YtDlp {
    binary: String,
    default_search: String,
}

impl YtDlp {
    pub fn new(binary: impl Into<String>, default_search: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            default_search: default_search.into(),
        }
    }

    fn args<'a>(&'a self, query: &'a str) -> Vec<&'a str> {
        vec![
            "--dump-single-json",
            "--format",
            "bestaudio/best",
            "--default-search",
            self.default_search.as_str(),
            "--source-address",
            "0.0.0.0",
            "--quiet",
            "--no-warnings",
            "--",
            query,
        ]
    }
}

impl MediaLookup for YtDlp {
    fn extract_info(&self, query: &str) -> Result<MediaInfo> {
        debug!("📊 Consulta yt-dlp: {}", query);

        let output = Command::new(&self.binary)
            .args(self.args(query))
            .output()
            .with_context(|| format!("Could not run {}", self.binary))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        serde_json::from_slice(&output.stdout).context("Could not parse yt-dlp output")
    }
}
