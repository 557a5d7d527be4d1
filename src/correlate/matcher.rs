// src/correlate/matcher.rs

//! Pairing launch records with discovered processes.
//!
//! [`correlate`] is pure: it never mutates its inputs and shares no state
//! with the orchestrator. For every record (earliest start first) it tries,
//! over the discovered processes nobody has claimed yet:
//!
//! 1. content match: the streaming id contains the iteration or the pid;
//! 2. sequential fallback: the first unclaimed process by pid;
//! 3. temporal fallback: see [`TEMPORAL_WINDOW`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, Serializer};

use crate::types::{LaunchRecord, ProcessId};

use super::discovery::DiscoveredProcess;

/// Window of the temporal fallback.
///
/// The fallback compares the time elapsed since the record started, measured
/// at evaluation time, and never looks at the discovered process. It is only
/// consulted when the sequential fallback found nothing, i.e. when no
/// unclaimed candidate remains, so in practice it never matches.
pub const TEMPORAL_WINDOW: TimeDelta = TimeDelta::minutes(5);

/// Why a record was paired with a discovered process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    StreamingIdContainsIteration(u32),
    StreamingIdContainsPid(ProcessId),
    Sequential { iteration: u32 },
    TimeProximity { seconds: i64 },
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::StreamingIdContainsIteration(iteration) => {
                write!(f, "StreamingID contains iteration {iteration}")
            }
            MatchReason::StreamingIdContainsPid(pid) => {
                write!(f, "StreamingID contains EL PID {pid}")
            }
            MatchReason::Sequential { iteration } => {
                write!(f, "Sequential matching (EL {iteration} -> first available Unreal)")
            }
            MatchReason::TimeProximity { seconds } => {
                write!(f, "Time proximity ({seconds}s difference)")
            }
        }
    }
}

impl Serialize for MatchReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationStatus {
    Matched,
    NoMatch,
}

impl fmt::Display for CorrelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CorrelationStatus::Matched => "MATCHED",
            CorrelationStatus::NoMatch => "NO_MATCH",
        })
    }
}

/// Outcome for one launch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub launch_record: LaunchRecord,
    pub matched: Option<DiscoveredProcess>,
    pub match_reason: Option<MatchReason>,
    pub status: CorrelationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationReport {
    /// One entry per launch record, in matching order.
    pub correlations: Vec<Correlation>,
    /// Discovered processes claimed by no record, by pid.
    pub orphaned: Vec<DiscoveredProcess>,
    pub generated_at: DateTime<Utc>,
}

impl CorrelationReport {
    pub fn matched_count(&self) -> usize {
        self.correlations
            .iter()
            .filter(|c| c.status == CorrelationStatus::Matched)
            .count()
    }

    /// Matched plus orphaned discovered processes.
    pub fn discovered_count(&self) -> usize {
        self.matched_count() + self.orphaned.len()
    }
}

/// Correlate at the current time.
pub fn correlate(records: &[LaunchRecord], discovered: &[DiscoveredProcess]) -> CorrelationReport {
    correlate_at(records, discovered, Utc::now())
}

/// Correlate with `now` as the evaluation instant of the temporal fallback.
pub fn correlate_at(
    records: &[LaunchRecord],
    discovered: &[DiscoveredProcess],
    now: DateTime<Utc>,
) -> CorrelationReport {
    let mut records: Vec<&LaunchRecord> = records.iter().collect();
    records.sort_by_key(|r| (r.start_time, r.iteration));

    let mut candidates: Vec<&DiscoveredProcess> = discovered.iter().collect();
    candidates.sort_by_key(|d| d.pid);

    // Indices into `candidates`.
    let mut claimed = BTreeSet::new();
    let mut correlations = Vec::with_capacity(records.len());

    for record in records {
        let found = content_match(record, &candidates, &claimed)
            .or_else(|| sequential_match(record, &candidates, &claimed))
            .or_else(|| temporal_match(record, &candidates, &claimed, now));

        let correlation = match found {
            Some((idx, reason)) => {
                claimed.insert(idx);
                Correlation {
                    launch_record: record.clone(),
                    matched: Some(candidates[idx].clone()),
                    match_reason: Some(reason),
                    status: CorrelationStatus::Matched,
                }
            }
            None => Correlation {
                launch_record: record.clone(),
                matched: None,
                match_reason: None,
                status: CorrelationStatus::NoMatch,
            },
        };
        correlations.push(correlation);
    }

    let orphaned = candidates
        .iter()
        .enumerate()
        .filter(|(idx, _)| !claimed.contains(idx))
        .map(|(_, d)| (*d).clone())
        .collect();

    CorrelationReport {
        correlations,
        orphaned,
        generated_at: now,
    }
}

fn unclaimed<'a>(
    candidates: &'a [&'a DiscoveredProcess],
    claimed: &'a BTreeSet<usize>,
) -> impl Iterator<Item = (usize, &'a DiscoveredProcess)> + 'a {
    candidates
        .iter()
        .enumerate()
        .filter(move |(idx, _)| !claimed.contains(idx))
        .map(|(idx, d)| (idx, *d))
}

fn content_match(
    record: &LaunchRecord,
    candidates: &[&DiscoveredProcess],
    claimed: &BTreeSet<usize>,
) -> Option<(usize, MatchReason)> {
    let iteration = record.iteration.to_string();
    let pid = record.pid.to_string();

    // Per candidate: iteration first, then pid.
    unclaimed(candidates, claimed).find_map(|(idx, d)| {
        if d.streaming_id.contains(&iteration) {
            Some((idx, MatchReason::StreamingIdContainsIteration(record.iteration)))
        } else if d.streaming_id.contains(&pid) {
            Some((idx, MatchReason::StreamingIdContainsPid(record.pid)))
        } else {
            None
        }
    })
}

fn sequential_match(
    record: &LaunchRecord,
    candidates: &[&DiscoveredProcess],
    claimed: &BTreeSet<usize>,
) -> Option<(usize, MatchReason)> {
    unclaimed(candidates, claimed).next().map(|(idx, _)| {
        (
            idx,
            MatchReason::Sequential {
                iteration: record.iteration,
            },
        )
    })
}

fn temporal_match(
    record: &LaunchRecord,
    candidates: &[&DiscoveredProcess],
    claimed: &BTreeSet<usize>,
    now: DateTime<Utc>,
) -> Option<(usize, MatchReason)> {
    let elapsed = (now - record.start_time).abs();
    if elapsed >= TEMPORAL_WINDOW {
        return None;
    }
    unclaimed(candidates, claimed).next().map(|(idx, _)| {
        (
            idx,
            MatchReason::TimeProximity {
                seconds: (elapsed.num_milliseconds() + 500) / 1000,
            },
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
    }

    fn discovered(pid: ProcessId, streaming_id: &str) -> DiscoveredProcess {
        DiscoveredProcess {
            pid,
            app_name: "Town.exe".to_string(),
            streaming_id: streaming_id.to_string(),
            streaming_port: None,
            command_line: format!("Town.exe -PixelStreamingID={streaming_id}"),
            discovered_at: at(0),
        }
    }

    #[test]
    fn content_match_checks_iteration_before_pid_per_candidate() {
        let records = [LaunchRecord::running(7, 42, at(0))];
        // 500 carries the pid, 501 the iteration; candidates are visited by
        // pid, so the pid match on 500 wins.
        let found = [discovered(500, "pid42"), discovered(501, "iter7")];

        let report = correlate_at(&records, &found, at(10));
        let c = &report.correlations[0];
        assert_eq!(c.matched.as_ref().map(|d| d.pid), Some(500));
        assert_eq!(c.match_reason, Some(MatchReason::StreamingIdContainsPid(42)));
    }

    #[test]
    fn records_are_processed_by_start_time_then_iteration() {
        let records = [
            LaunchRecord::running(3, 300, at(5)),
            LaunchRecord::running(2, 200, at(0)),
            LaunchRecord::running(1, 100, at(5)),
        ];
        let found = [discovered(900, "a"), discovered(901, "b"), discovered(902, "c")];

        let report = correlate_at(&records, &found, at(10));
        let order: Vec<_> = report
            .correlations
            .iter()
            .map(|c| (c.launch_record.iteration, c.matched.as_ref().map(|d| d.pid)))
            .collect();
        assert_eq!(order, vec![(2, Some(900)), (1, Some(901)), (3, Some(902))]);
    }

    #[test]
    fn exhausted_candidates_give_no_match() {
        let records = [
            LaunchRecord::running(1, 100, at(0)),
            LaunchRecord::running(2, 101, at(1)),
        ];
        let found = [discovered(500, "zzz")];

        let report = correlate_at(&records, &found, at(2));
        assert_eq!(report.correlations[0].status, CorrelationStatus::Matched);
        assert_eq!(
            report.correlations[0].match_reason,
            Some(MatchReason::Sequential { iteration: 1 })
        );
        assert_eq!(report.correlations[1].status, CorrelationStatus::NoMatch);
        assert!(report.correlations[1].match_reason.is_none());
        assert!(report.orphaned.is_empty());
    }

    #[test]
    fn reasons_render_readably() {
        assert_eq!(
            MatchReason::StreamingIdContainsIteration(3).to_string(),
            "StreamingID contains iteration 3"
        );
        assert_eq!(
            MatchReason::Sequential { iteration: 2 }.to_string(),
            "Sequential matching (EL 2 -> first available Unreal)"
        );
        assert_eq!(
            MatchReason::TimeProximity { seconds: 12 }.to_string(),
            "Time proximity (12s difference)"
        );
    }

    #[test]
    fn report_serializes_status_and_reason_as_text() {
        let records = [LaunchRecord::running(1, 100, at(0))];
        let found = [discovered(500, "x_1")];

        let json = serde_json::to_value(correlate_at(&records, &found, at(1))).unwrap();
        assert_eq!(json["correlations"][0]["status"], "MATCHED");
        assert_eq!(
            json["correlations"][0]["matchReason"],
            "StreamingID contains iteration 1"
        );
        assert_eq!(json["orphaned"], serde_json::json!([]));
    }
}
