// src/correlate/discovery.rs

//! Turning process-table entries into [`DiscoveredProcess`] values.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::exec::{ProcessEntry, ProcessGateway};
use crate::types::ProcessId;

/// Placeholder for fields that could not be extracted.
pub const UNKNOWN: &str = "Unknown";

static STREAMING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-PixelStreamingID=\s*(\S+)").expect("static regex"));
static APP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\\/]+\.exe)").expect("static regex"));
static STREAMING_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ws://127\.0\.0\.1:(\d+)").expect("static regex"));

/// A downstream process found by scanning the OS process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredProcess {
    pub pid: ProcessId,
    pub app_name: String,
    pub streaming_id: String,
    pub streaming_port: Option<u16>,
    pub command_line: String,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredProcess {
    pub fn from_entry(entry: ProcessEntry, discovered_at: DateTime<Utc>) -> Self {
        let ProcessEntry { pid, command_line } = entry;
        Self {
            pid,
            app_name: extract_app_name(&command_line),
            streaming_id: extract_streaming_id(&command_line),
            streaming_port: extract_streaming_port(&command_line),
            command_line,
            discovered_at,
        }
    }
}

/// Query the gateway for processes matching `keywords` and extract their
/// streaming attributes.
pub async fn scan<G: ProcessGateway + ?Sized>(
    gateway: &G,
    keywords: &[String],
) -> Result<Vec<DiscoveredProcess>> {
    let entries = gateway.query(keywords.to_vec()).await?;
    let now = Utc::now();
    let discovered: Vec<_> = entries
        .into_iter()
        .map(|e| DiscoveredProcess::from_entry(e, now))
        .collect();
    debug!(count = discovered.len(), "downstream processes discovered");
    Ok(discovered)
}

pub fn extract_streaming_id(command_line: &str) -> String {
    STREAMING_ID_RE
        .captures(command_line)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Last path segment ending in `.exe`, else the file name of the first
/// token, else [`UNKNOWN`].
pub fn extract_app_name(command_line: &str) -> String {
    if let Some(c) = APP_NAME_RE.captures(command_line) {
        return c[1].to_string();
    }

    command_line
        .split_whitespace()
        .next()
        .map(|token| token.trim_matches('"'))
        .and_then(|token| Path::new(token).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn extract_streaming_port(command_line: &str) -> Option<u16> {
    STREAMING_PORT_RE
        .captures(command_line)
        .and_then(|c| c[1].parse().ok())
}
