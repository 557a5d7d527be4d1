// src/correlate/mod.rs

//! Reconciling launch records with independently discovered processes.
//!
//! - [`discovery`]: process-table entries → [`DiscoveredProcess`].
//! - [`matcher`]: the pure [`correlate`] function.
//! - [`source`]: where launch records come from (local or remote).
//! - [`report`] and [`tracker`]: rendering and the `track` command loop.

pub mod discovery;
pub mod matcher;
pub mod report;
pub mod source;
pub mod tracker;

pub use discovery::{DiscoveredProcess, scan};
pub use matcher::{
    Correlation, CorrelationReport, CorrelationStatus, MatchReason, TEMPORAL_WINDOW, correlate,
    correlate_at,
};
pub use report::render_text;
pub use source::{LaunchRecordSource, RecordsFuture, RemoteRecordSource};
pub use tracker::{ReportFormat, TrackOptions, render, run_tracker, track_once};
