// src/correlate/tracker.rs

//! One-shot and continuous tracking: fetch records, scan, correlate, print.

use std::time::Duration;

use tracing::{error, info};

use crate::errors::{LaunchwatchError, Result};
use crate::exec::ProcessGateway;

use super::discovery::scan;
use super::matcher::{CorrelationReport, correlate};
use super::report::render_text;
use super::source::LaunchRecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct TrackOptions {
    pub keywords: Vec<String>,
    /// Repeat every `interval` until Ctrl-C instead of running once.
    pub continuous: bool,
    pub interval: Duration,
    pub format: ReportFormat,
}

/// Fetch records and scan the process table concurrently, then correlate.
///
/// A failed scan is logged and treated as "nothing discovered".
pub async fn track_once<G, S>(gateway: &G, source: &S, keywords: &[String]) -> CorrelationReport
where
    G: ProcessGateway + ?Sized,
    S: LaunchRecordSource + ?Sized,
{
    let (records, discovered) = tokio::join!(source.fetch(), scan(gateway, keywords));

    let discovered = discovered.unwrap_or_else(|e| {
        error!(error = %e, "process scan failed; treating as no downstream processes");
        Vec::new()
    });

    info!(
        source = %source.describe(),
        records = records.len(),
        discovered = discovered.len(),
        "correlating"
    );
    correlate(&records, &discovered)
}

pub fn render(report: &CorrelationReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| LaunchwatchError::Other(anyhow::Error::from(e))),
    }
}

/// Run the tracker, printing each report to stdout.
pub async fn run_tracker<G, S>(gateway: &G, source: &S, options: &TrackOptions) -> Result<()>
where
    G: ProcessGateway + ?Sized,
    S: LaunchRecordSource + ?Sized,
{
    let report = track_once(gateway, source, &options.keywords).await;
    println!("{}", render(&report, options.format)?);

    if !options.continuous {
        return Ok(());
    }

    info!(interval = ?options.interval, "continuous tracking; press Ctrl-C to stop");
    let mut ticker = tokio::time::interval(options.interval);
    // The first tick completes immediately; the first report is already out.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("tracking stopped");
                return Ok(());
            }
            _ = ticker.tick() => {
                let report = track_once(gateway, source, &options.keywords).await;
                println!("{}", render(&report, options.format)?);
            }
        }
    }
}
