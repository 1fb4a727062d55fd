//! The external metadata extractor and the one place that reads its error text.

use core::time::Duration;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::record::{FailureReason, RawInfo};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to start extractor: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("extractor timed out after {0:?}")]
    Timeout(Duration),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("extractor output is not valid info JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch the info dict for `url` without downloading any media.
    async fn extract(&self, url: &str) -> Result<RawInfo, ProviderError>;
}

/// Map a provider failure onto the reasons users get to see.
///
/// These substrings track the extractor's current wording; anything else is generic.
#[must_use]
pub fn classify(err: &ProviderError) -> FailureReason {
    let ProviderError::Extraction(message) = err else {
        return FailureReason::Generic;
    };
    if message.contains("Sign in to confirm your age") {
        FailureReason::AgeRestricted
    } else if message.contains("Video unavailable") || message.contains("Incomplete YouTube ID") {
        FailureReason::MalformedId
    } else {
        FailureReason::Generic
    }
}

/// Runs the `yt-dlp` executable in simulate mode and parses its JSON dump.
#[derive(Debug, Clone)]
pub struct YtDlp {
    pub program: String,
    pub timeout: Duration,
    pub extra_args: Vec<String>,
}

impl YtDlp {
    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "--dump-single-json",
            "--no-download",
            "--no-playlist",
            "--no-warnings",
        ])
        .args(&self.extra_args)
        .arg("--")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl MetadataProvider for YtDlp {
    async fn extract(&self, url: &str) -> Result<RawInfo, ProviderError> {
        debug!(program = %self.program, url, "Running extractor");
        let output = tokio::time::timeout(self.timeout, self.command(url).output())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            debug!(status = %output.status, stderr = %stderr, url, "Extractor failed");
            return Err(ProviderError::Extraction(stderr));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
