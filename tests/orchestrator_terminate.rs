// tests/orchestrator_terminate.rs

use std::error::Error;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use launchwatch::errors::LaunchwatchError;
use launchwatch::orchestrator::LaunchOrchestrator;
use launchwatch::types::{LaunchBatch, TerminationOutcome};
use launchwatch_test_utils::builders::{LauncherSettingsBuilder, termination};
use launchwatch_test_utils::{FIRST_PID, FakeGateway, init_tracing, settle};

type TestResult = Result<(), Box<dyn Error>>;

const D: Duration = Duration::from_secs(60);
const POLL: Duration = Duration::from_millis(200);

/// Orchestrator with `count` instances already spawned and registered.
async fn with_instances(
    gateway: &FakeGateway,
    poll_attempts: u32,
    count: i64,
) -> Result<LaunchOrchestrator<FakeGateway>, Box<dyn Error>> {
    let orch = LaunchOrchestrator::new(
        gateway.clone(),
        LauncherSettingsBuilder::new().launch_delay(D).build(),
        termination(poll_attempts, POLL),
    );
    orch.start_batch(count)?;
    sleep(D * (count as u32 - 1)).await;
    settle().await;
    assert_eq!(orch.snapshot().total_processes, count as usize);
    Ok(orch)
}

fn pids(orch: &LaunchOrchestrator<FakeGateway>) -> Vec<u32> {
    orch.snapshot().processes.iter().map(|r| r.pid).collect()
}

#[tokio::test(start_paused = true)]
async fn unknown_pid_is_not_found_and_registry_untouched() -> TestResult {
    init_tracing();
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 3, 2).await?;

    let err = orch.terminate(4242).await.unwrap_err();
    assert!(matches!(err, LaunchwatchError::ProcessNotFound(4242)));
    assert_eq!(pids(&orch), vec![FIRST_PID, FIRST_PID + 1]);
    assert!(gateway.signalled().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn terminate_removes_exactly_that_record() -> TestResult {
    init_tracing();
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 3, 3).await?;

    let outcome = orch.terminate(FIRST_PID + 1).await?;
    assert_eq!(outcome, TerminationOutcome::ConfirmedDead);
    assert_eq!(pids(&orch), vec![FIRST_PID, FIRST_PID + 2]);
    assert_eq!(gateway.signalled(), vec![FIRST_PID + 1]);

    let err = orch.terminate(FIRST_PID + 1).await.unwrap_err();
    assert!(matches!(err, LaunchwatchError::ProcessNotFound(_)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn surviving_process_is_reported_unconfirmed_after_polling() -> TestResult {
    init_tracing();
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 4, 1).await?;
    gateway.survive_signal(FIRST_PID);

    let started = Instant::now();
    let outcome = orch.terminate(FIRST_PID).await?;

    assert_eq!(outcome, TerminationOutcome::SignalSentUnconfirmed);
    assert_eq!(Instant::now() - started, POLL * 4);
    // The record is gone even though the process is not.
    assert!(pids(&orch).is_empty());
    assert!(gateway.is_running(FIRST_PID));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn zero_poll_attempts_is_fire_and_forget() -> TestResult {
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 0, 1).await?;

    let started = Instant::now();
    let outcome = orch.terminate(FIRST_PID).await?;
    assert_eq!(outcome, TerminationOutcome::SignalSentUnconfirmed);
    assert_eq!(Instant::now(), started);
    assert_eq!(gateway.signalled(), vec![FIRST_PID]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn already_exited_process_is_dropped_without_signal() -> TestResult {
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 3, 2).await?;

    gateway.exit(FIRST_PID, Some(0));
    settle().await;

    let outcome = orch.terminate(FIRST_PID).await?;
    assert_eq!(outcome, TerminationOutcome::NotFound);
    assert!(gateway.signalled().is_empty());
    assert_eq!(pids(&orch), vec![FIRST_PID + 1]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn signal_failure_propagates_and_keeps_record() -> TestResult {
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 3, 1).await?;
    gateway.fail_signal(FIRST_PID);

    let err = orch.terminate(FIRST_PID).await.unwrap_err();
    assert!(matches!(err, LaunchwatchError::GatewayError(_)));
    assert_eq!(pids(&orch), vec![FIRST_PID]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn terminate_all_counts_failures_and_always_resets() -> TestResult {
    init_tracing();
    let gateway = FakeGateway::new();
    let orch = with_instances(&gateway, 3, 3).await?;
    gateway.fail_signal(FIRST_PID + 1);

    let summary = orch.terminate_all().await;
    assert_eq!(summary.terminated_count, 2);
    assert_eq!(summary.failed_count, 1);
    assert!(summary.terminated_count <= 3);

    assert!(orch.snapshot().processes.is_empty());
    assert_eq!(orch.status(), LaunchBatch::idle());
    assert_eq!(
        gateway.signalled(),
        vec![FIRST_PID, FIRST_PID + 1, FIRST_PID + 2]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn terminate_all_on_empty_registry_is_a_no_op() -> TestResult {
    let gateway = FakeGateway::new();
    let orch = LaunchOrchestrator::new(
        gateway.clone(),
        LauncherSettingsBuilder::new().build(),
        termination(3, POLL),
    );

    let summary = orch.terminate_all().await;
    assert_eq!(summary.terminated_count, 0);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(orch.status(), LaunchBatch::idle());
    Ok(())
}
