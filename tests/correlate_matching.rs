// tests/correlate_matching.rs

use launchwatch::correlate::{CorrelationStatus, MatchReason, TEMPORAL_WINDOW, correlate_at};
use launchwatch_test_utils::builders::{at, discovered, record};

#[test]
fn iteration_in_streaming_id_pairs_records_with_their_apps() {
    let records = [record(1, 100, 0), record(2, 101, 10)];
    let found = [discovered(500, "x_1_abc"), discovered(501, "x_2_def")];

    let report = correlate_at(&records, &found, at(20));

    assert_eq!(report.correlations.len(), 2);
    let first = &report.correlations[0];
    assert_eq!(first.launch_record.iteration, 1);
    assert_eq!(first.matched.as_ref().map(|d| d.pid), Some(500));
    assert_eq!(first.match_reason, Some(MatchReason::StreamingIdContainsIteration(1)));

    let second = &report.correlations[1];
    assert_eq!(second.matched.as_ref().map(|d| d.pid), Some(501));
    assert_eq!(second.match_reason, Some(MatchReason::StreamingIdContainsIteration(2)));

    assert!(report.orphaned.is_empty());
}

#[test]
fn excess_discovered_processes_are_orphaned() {
    let records = [record(1, 100, 0)];
    let found = [
        discovered(502, "c"),
        discovered(500, "x_1"),
        discovered(501, "b"),
    ];

    let report = correlate_at(&records, &found, at(1));

    assert_eq!(report.correlations[0].matched.as_ref().map(|d| d.pid), Some(500));
    let orphans: Vec<_> = report.orphaned.iter().map(|d| d.pid).collect();
    assert_eq!(orphans, vec![501, 502]);
}

#[test]
fn no_records_orphans_everything() {
    let found = [discovered(501, "a"), discovered(500, "b")];

    let report = correlate_at(&[], &found, at(0));

    assert!(report.correlations.is_empty());
    let orphans: Vec<_> = report.orphaned.iter().map(|d| d.pid).collect();
    assert_eq!(orphans, vec![500, 501]);
}

#[test]
fn pid_in_streaming_id_is_a_content_match() {
    let records = [record(9, 4321, 0)];
    let found = [discovered(700, "sess-4321")];

    let report = correlate_at(&records, &found, at(1));
    assert_eq!(
        report.correlations[0].match_reason,
        Some(MatchReason::StreamingIdContainsPid(4321))
    );
}

#[test]
fn sequential_fallback_takes_lowest_unclaimed_pid() {
    let records = [record(1, 100, 0), record(2, 101, 5)];
    let found = [discovered(900, "zzz"), discovered(800, "iter-2"), discovered(850, "yyy")];

    let report = correlate_at(&records, &found, at(10));

    // "iter-2" contains neither "1" nor "100", so record 1 falls back to the
    // lowest pid and takes it before record 2 gets a chance.
    let first = &report.correlations[0];
    assert_eq!(first.matched.as_ref().map(|d| d.pid), Some(800));
    assert_eq!(first.match_reason, Some(MatchReason::Sequential { iteration: 1 }));

    let second = &report.correlations[1];
    assert_eq!(second.matched.as_ref().map(|d| d.pid), Some(850));
    assert_eq!(second.match_reason, Some(MatchReason::Sequential { iteration: 2 }));

    assert_eq!(report.orphaned.len(), 1);
    assert_eq!(report.orphaned[0].pid, 900);
}

#[test]
fn claimed_process_is_never_matched_twice() {
    let records = [record(1, 100, 0), record(11, 110, 1)];
    // "x_11" contains both "1" and "11"; record 1 claims it first.
    let found = [discovered(500, "x_11")];

    let report = correlate_at(&records, &found, at(2));
    assert_eq!(report.correlations[0].status, CorrelationStatus::Matched);
    assert_eq!(report.correlations[1].status, CorrelationStatus::NoMatch);
}

#[test]
fn temporal_window_cannot_rescue_an_exhausted_pool() {
    // The record started well inside the window, yet nothing is left to claim.
    let records = [record(1, 100, 0), record(2, 101, 1)];
    let found = [discovered(500, "abc")];
    let now = at(0) + TEMPORAL_WINDOW / 2;

    let report = correlate_at(&records, &found, now);
    assert_eq!(report.correlations[1].status, CorrelationStatus::NoMatch);
    assert!(report.correlations[1].matched.is_none());
}

#[test]
fn inputs_are_left_untouched_and_output_is_deterministic() {
    let records = vec![record(2, 101, 5), record(1, 100, 0)];
    let found = vec![discovered(501, "b"), discovered(500, "a")];
    let (records_before, found_before) = (records.clone(), found.clone());

    let a = correlate_at(&records, &found, at(30));
    let b = correlate_at(&records, &found, at(30));

    assert_eq!(a, b);
    assert_eq!(records, records_before);
    assert_eq!(found, found_before);
}
