// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `launchwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "launchwatch",
    version,
    about = "Launch executables on a staggered schedule and track what they started.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Launchwatch.toml` in the current working directory. A
    /// missing file is only an error for `serve`.
    #[arg(long, global = true, value_name = "PATH", default_value = "Launchwatch.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LAUNCHWATCH_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP API and launch instances on request.
    Serve(ServeArgs),
    /// Correlate launched instances with downstream processes.
    Track(TrackArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Parse + validate the config, print it, but don't start the server.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TrackArgs {
    /// Keep tracking until Ctrl-C.
    #[arg(long)]
    pub continuous: bool,

    /// Seconds between reports in continuous mode (overrides the config).
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Base URL of the launchwatch server to read launch records from.
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
