// src/correlate/source.rs

//! Where the tracker gets launch records from.
//!
//! - [`LaunchOrchestrator`] in the same process: its snapshot.
//! - [`RemoteRecordSource`]: `GET {server}/api/processes` on a running
//!   server, with a local `curl -s` fallback.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::errors::{LaunchwatchError, Result};
use crate::exec::ProcessGateway;
use crate::orchestrator::{LaunchOrchestrator, OrchestratorSnapshot};
use crate::types::LaunchRecord;

/// Boxed future yielding launch records.
pub type RecordsFuture<'a> = Pin<Box<dyn Future<Output = Vec<LaunchRecord>> + Send + 'a>>;

/// Provider of launch records. Fetching never fails; an unreachable source
/// yields an empty list and logs why.
pub trait LaunchRecordSource: Send + Sync {
    /// Human readable origin, used in logs and the report header.
    fn describe(&self) -> String;

    fn fetch(&self) -> RecordsFuture<'_>;
}

impl<G: ProcessGateway> LaunchRecordSource for LaunchOrchestrator<G> {
    fn describe(&self) -> String {
        "local orchestrator".to_string()
    }

    fn fetch(&self) -> RecordsFuture<'_> {
        let records = self.snapshot().processes;
        Box::pin(async move { records })
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Records read from a remote server's `/api/processes`.
#[derive(Debug, Clone)]
pub struct RemoteRecordSource {
    url: String,
    client: Client,
    curl_fallback: bool,
}

impl RemoteRecordSource {
    pub fn new(server_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LaunchwatchError::ConfigError(format!("building HTTP client: {e}")))?;

        Ok(Self {
            url: format!("{}/api/processes", server_url.trim_end_matches('/')),
            client,
            curl_fallback: true,
        })
    }

    /// Disable the `curl` fallback (used when `curl` is known to be absent).
    pub fn without_curl_fallback(mut self) -> Self {
        self.curl_fallback = false;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_http(&self) -> anyhow::Result<OrchestratorSnapshot> {
        let snapshot = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("requesting {}", self.url))?
            .error_for_status()?
            .json::<OrchestratorSnapshot>()
            .await
            .context("decoding process list")?;
        Ok(snapshot)
    }

    async fn fetch_curl(&self) -> anyhow::Result<OrchestratorSnapshot> {
        let output = Command::new("curl")
            .args(["-s", self.url.as_str()])
            .stdin(Stdio::null())
            .output()
            .await
            .context("running curl")?;

        if !output.status.success() {
            anyhow::bail!("curl exited with {}", output.status);
        }
        serde_json::from_slice(&output.stdout).context("decoding curl output")
    }

    fn log_troubleshooting(&self) {
        error!(url = %self.url, "could not fetch launch records from the server");
        warn!("is the launchwatch server running and reachable from this machine?");
        warn!("check the server URL (--server or [tracker].server_url) and any firewall rules");
        warn!("continuing with an empty launch record list");
    }
}

impl LaunchRecordSource for RemoteRecordSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> RecordsFuture<'_> {
        Box::pin(async move {
            let http_err = match self.fetch_http().await {
                Ok(snapshot) => {
                    debug!(count = snapshot.processes.len(), "launch records fetched over HTTP");
                    return snapshot.processes;
                }
                Err(e) => e,
            };

            if !self.curl_fallback {
                warn!(url = %self.url, error = %format!("{http_err:#}"), "HTTP fetch failed");
                self.log_troubleshooting();
                return Vec::new();
            }

            info!(
                url = %self.url,
                error = %format!("{http_err:#}"),
                "HTTP fetch failed; trying curl"
            );
            match self.fetch_curl().await {
                Ok(snapshot) => {
                    debug!(count = snapshot.processes.len(), "launch records fetched with curl");
                    snapshot.processes
                }
                Err(e) => {
                    warn!(url = %self.url, error = %format!("{e:#}"), "curl fallback failed");
                    self.log_troubleshooting();
                    Vec::new()
                }
            }
        })
    }
}
