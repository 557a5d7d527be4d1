// src/lib.rs

pub mod cli;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod orchestrator;
pub mod server;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, ServeArgs, TrackArgs};
use crate::config::{ConfigFile, LauncherSettings, load_and_validate, load_or_default};
use crate::correlate::{RemoteRecordSource, ReportFormat, TrackOptions, run_tracker};
use crate::exec::RealProcessGateway;
use crate::orchestrator::LaunchOrchestrator;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    match args.command {
        Command::Serve(serve) => run_serve(&config_path, serve).await,
        Command::Track(track) => run_track(&config_path, track).await,
    }
}

/// Load config, then serve the HTTP API until Ctrl-C.
///
/// Launched instances are independent processes and keep running after the
/// server stops.
async fn run_serve(config_path: &Path, args: ServeArgs) -> Result<()> {
    let cfg = load_and_validate(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let launcher = cfg
        .launcher
        .clone()
        .ok_or_else(|| anyhow!("{}: a [launcher] section is required to serve", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg, &launcher);
        return Ok(());
    }

    let orchestrator = LaunchOrchestrator::new(RealProcessGateway::new(), launcher, cfg.termination);
    let listener = TcpListener::bind(cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;

    server::serve(listener, orchestrator, shutdown_signal()).await?;
    Ok(())
}

async fn run_track(config_path: &Path, args: TrackArgs) -> Result<()> {
    let cfg = load_or_default(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let settings = cfg.tracker;

    let server_url = args.server.unwrap_or(settings.server_url);
    let source = RemoteRecordSource::new(&server_url)?;
    let options = TrackOptions {
        keywords: settings.keywords,
        continuous: args.continuous,
        interval: args
            .interval
            .map(Duration::from_secs)
            .unwrap_or(settings.interval),
        format: if args.json {
            ReportFormat::Json
        } else {
            ReportFormat::Text
        },
    };

    info!(server = %server_url, continuous = options.continuous, "tracking launched instances");
    run_tracker(&RealProcessGateway::new(), &source, &options).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Print the effective configuration without starting anything.
fn print_dry_run(cfg: &ConfigFile, launcher: &LauncherSettings) {
    println!("launchwatch dry-run");
    println!("  launcher.exe_path = {}", launcher.exe_path.display());
    if !launcher.args.is_empty() {
        println!("  launcher.args = {:?}", launcher.args);
    }
    println!("  launcher.launch_delay = {:?}", launcher.launch_delay);
    println!("  launcher.confirmation_delay = {:?}", launcher.confirmation_delay);
    println!("  launcher.connection_markers ({}):", launcher.connection_markers.len());
    for marker in &launcher.connection_markers {
        println!("    - {marker}");
    }
    println!(
        "  termination = {} polls every {:?}",
        cfg.termination.poll_attempts, cfg.termination.poll_interval
    );
    println!("  server.bind = {}", cfg.server.bind);
    println!("  tracker.server_url = {}", cfg.tracker.server_url);
    println!("  tracker.keywords = {:?}", cfg.tracker.keywords);
    println!("  tracker.interval = {:?}", cfg.tracker.interval);

    debug!("dry-run complete (nothing started)");
}
