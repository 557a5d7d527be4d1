// src/correlate/report.rs

//! Human readable rendering of a [`CorrelationReport`].

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::types::LaunchStatus;

use super::discovery::DiscoveredProcess;
use super::matcher::CorrelationReport;

const RULE_WIDTH: usize = 80;
const BLOCK_WIDTH: usize = 60;
const COMMAND_PREVIEW: usize = 100;

pub fn render_text(report: &CorrelationReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &CorrelationReport) -> std::fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    let block_rule = "-".repeat(BLOCK_WIDTH);

    writeln!(out, "{rule}")?;
    writeln!(out, "LAUNCH / DOWNSTREAM PROCESS TRACKING REPORT")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Generated at: {}", local_time(report.generated_at))?;
    writeln!(out, "Launch records: {}", report.correlations.len())?;
    writeln!(out, "Downstream processes: {}", report.discovered_count())?;
    writeln!(out, "Matched: {}", report.matched_count())?;
    writeln!(out, "{rule}")?;

    if report.correlations.is_empty() && !report.orphaned.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "WARNING: found downstream processes but no launch records from the server."
        )?;
        writeln!(out, "  This could mean:")?;
        writeln!(out, "  - launched instances exist but the server could not be reached")?;
        writeln!(out, "  - the downstream apps were started manually")?;
        writeln!(out, "  - launched instances exited and left their downstream apps running")?;
    }

    for (idx, c) in report.correlations.iter().enumerate() {
        let record = &c.launch_record;
        writeln!(out)?;
        writeln!(out, "[{}] LAUNCHED INSTANCE (iteration {})", idx + 1, record.iteration)?;
        writeln!(out, "    PID: {}", record.pid)?;
        writeln!(out, "    Status: {}", status_label(record.status))?;
        writeln!(out, "    Start time: {}", local_time(record.start_time))?;
        writeln!(out, "    Correlation: {}", c.status)?;

        match (&c.matched, &c.match_reason) {
            (Some(found), reason) => {
                writeln!(out)?;
                writeln!(out, "    -> DOWNSTREAM APP")?;
                write_process(out, found, "        ")?;
                match reason {
                    Some(reason) => writeln!(out, "        Match reason: {reason}")?,
                    None => writeln!(out, "        Match reason: Unknown")?,
                }
            }
            (None, _) => writeln!(out, "    -> no downstream app found for this instance")?,
        }
        writeln!(out, "{block_rule}")?;
    }

    if !report.orphaned.is_empty() {
        writeln!(out)?;
        writeln!(out, "ORPHANED DOWNSTREAM PROCESSES (no matching launch record)")?;
        writeln!(out, "{block_rule}")?;
        for (idx, found) in report.orphaned.iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "[{}] ORPHANED PROCESS", idx + 1)?;
            write_process(out, found, "    ")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{rule}")
}

fn write_process(out: &mut String, p: &DiscoveredProcess, indent: &str) -> std::fmt::Result {
    writeln!(out, "{indent}App PID: {}", p.pid)?;
    writeln!(out, "{indent}App name: {}", p.app_name)?;
    writeln!(out, "{indent}Streaming ID: {}", p.streaming_id)?;
    match p.streaming_port {
        Some(port) => writeln!(out, "{indent}Streaming port: {port}")?,
        None => writeln!(out, "{indent}Streaming port: N/A")?,
    }
    writeln!(out, "{indent}Command: {}", preview(&p.command_line))
}

fn status_label(status: LaunchStatus) -> &'static str {
    match status {
        LaunchStatus::Running => "Running",
        LaunchStatus::Connected => "Connected",
        LaunchStatus::Terminated => "Terminated",
    }
}

fn preview(command_line: &str) -> String {
    match command_line.char_indices().nth(COMMAND_PREVIEW) {
        Some((cut, _)) => format!("{}...", &command_line[..cut]),
        None => command_line.to_string(),
    }
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
