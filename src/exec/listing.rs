// src/exec/listing.rs

//! Parsers for OS process-table listings.
//!
//! - Unix: `ps -eo pid=,args=`, one process per line, pid first.
//! - Windows: `wmic process get ProcessId,CommandLine /format:list`, blocks of
//!   `Key=Value` lines separated by blank lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::exec::gateway::ProcessEntry;

static WMIC_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ProcessId=(\d+)").expect("static regex"));
static WMIC_CMDLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CommandLine=(.*)").expect("static regex"));
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n\s*\r?\n").expect("static regex"));

/// Parse the output of `ps -eo pid=,args=`.
///
/// Lines without a leading numeric pid or without a command line (kernel
/// threads on some systems) are skipped.
pub fn parse_ps_listing(output: &str) -> Vec<ProcessEntry> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (pid, rest) = line.split_once(char::is_whitespace)?;
            let pid = pid.parse().ok()?;
            let command_line = rest.trim();
            if command_line.is_empty() {
                return None;
            }
            Some(ProcessEntry {
                pid,
                command_line: command_line.to_string(),
            })
        })
        .collect()
}

/// Parse the `/format:list` output of `wmic process`.
///
/// Blocks with an empty `CommandLine=` (system processes) are skipped.
pub fn parse_wmic_listing(output: &str) -> Vec<ProcessEntry> {
    BLANK_LINE
        .split(output)
        .filter(|block| !block.trim().is_empty())
        .filter_map(|block| {
            let pid = WMIC_PID.captures(block)?.get(1)?.as_str().parse().ok()?;
            let command_line = WMIC_CMDLINE.captures(block)?.get(1)?.as_str().trim();
            if command_line.is_empty() {
                return None;
            }
            Some(ProcessEntry {
                pid,
                command_line: command_line.to_string(),
            })
        })
        .collect()
}

/// Keep entries whose command line contains any of `keywords`.
pub fn filter_by_keywords(entries: Vec<ProcessEntry>, keywords: &[String]) -> Vec<ProcessEntry> {
    entries
        .into_iter()
        .filter(|e| keywords.iter().any(|k| e.command_line.contains(k.as_str())))
        .collect()
}
