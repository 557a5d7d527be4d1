// src/orchestrator/launcher.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{LauncherSettings, TerminationSettings};
use crate::detect::{ConnectionDetector, MarkerDetector};
use crate::errors::{LaunchwatchError, Result};
use crate::exec::{ProcessGateway, SpawnRequest};
use crate::types::{
    LaunchBatch, LaunchRecord, LaunchStatus, ProcessId, TerminateAllSummary, TerminationOutcome,
};

use super::observer::observe_instance;
use super::registry::ProcessRegistry;
use super::schedule::{CancelHandle, LaunchQueue, PendingLaunch, cancel_pair};
use super::{LaunchReceipt, OrchestratorSnapshot};

/// Shared handle over the launch registry and the current batch.
///
/// Cloning is cheap; every clone drives the same state. Spawning, output
/// observation and liveness checks go through the [`ProcessGateway`] `G`.
pub struct LaunchOrchestrator<G: ProcessGateway> {
    inner: Arc<Inner<G>>,
}

impl<G: ProcessGateway> Clone for LaunchOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: ProcessGateway> fmt::Debug for LaunchOrchestrator<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("LaunchOrchestrator")
            .field("records", &state.registry.len())
            .field("batch", &state.batch)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

pub(super) struct Inner<G> {
    pub(super) gateway: G,
    pub(super) launcher: LauncherSettings,
    termination: TerminationSettings,
    pub(super) detector: Arc<dyn ConnectionDetector>,
    state: Mutex<OrchestratorState>,
}

#[derive(Debug, Default)]
pub(super) struct OrchestratorState {
    pub(super) registry: ProcessRegistry,
    pub(super) batch: LaunchBatch,
    /// Bumped on every batch start and every bulk clear. Observers and
    /// timers compare against the value they were started with.
    pub(super) generation: u64,
    cancel: Option<CancelHandle>,
}

impl<G> Inner<G> {
    pub(super) fn lock_state(&self) -> MutexGuard<'_, OrchestratorState> {
        // No critical section can leave the state half-updated, so a
        // poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: ProcessGateway> LaunchOrchestrator<G> {
    /// Build an orchestrator that detects connections with the configured
    /// marker list.
    pub fn new(gateway: G, launcher: LauncherSettings, termination: TerminationSettings) -> Self {
        let detector = Arc::new(MarkerDetector::new(launcher.connection_markers.clone()));
        Self::with_detector(gateway, launcher, termination, detector)
    }

    pub fn with_detector(
        gateway: G,
        launcher: LauncherSettings,
        termination: TerminationSettings,
        detector: Arc<dyn ConnectionDetector>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                launcher,
                termination,
                detector,
                state: Mutex::new(OrchestratorState::default()),
            }),
        }
    }

    /// Queue `iteration_count` staggered spawns and return immediately.
    ///
    /// Must be called from within a tokio runtime; the spawns are driven by a
    /// background task.
    pub fn start_batch(&self, iteration_count: i64) -> Result<LaunchReceipt> {
        let (queue, generation, final_iteration, receipt) = {
            let mut state = self.inner.lock_state();

            if state.batch.running {
                warn!(
                    requested = iteration_count,
                    "launch rejected; a batch is already running"
                );
                return Err(LaunchwatchError::ConcurrencyError);
            }

            if iteration_count < 1 {
                return Err(LaunchwatchError::ValidationError(format!(
                    "{iteration_count} (must be at least 1)"
                )));
            }

            let start_iteration = state.registry.next_iteration();
            let iterations = u32::try_from(iteration_count)
                .ok()
                .filter(|n| start_iteration.checked_add(*n).is_some())
                .ok_or_else(|| {
                    LaunchwatchError::ValidationError(format!("{iteration_count} (too large)"))
                })?;

            let (handle, token) = cancel_pair();
            if let Some(previous) = state.cancel.replace(handle) {
                previous.cancel();
            }
            state.generation += 1;
            state.batch = LaunchBatch {
                total_requested: iterations,
                completed_count: 0,
                running: true,
                start_iteration,
            };

            let queue = LaunchQueue::staggered(
                start_iteration,
                iterations,
                self.inner.launcher.launch_delay,
                &token,
            );
            let receipt = LaunchReceipt {
                start_iteration,
                iterations,
                total_processes: state.registry.len() + iterations as usize,
            };
            (queue, state.generation, state.batch.final_iteration(), receipt)
        };

        info!(
            start_iteration = receipt.start_iteration,
            iterations = receipt.iterations,
            delay = ?self.inner.launcher.launch_delay,
            "launch batch started"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(drive_batch(inner, queue, generation, final_iteration));

        Ok(receipt)
    }

    /// Terminate the registered instance with OS pid `pid`.
    pub async fn terminate(&self, pid: ProcessId) -> Result<TerminationOutcome> {
        let iteration = {
            let state = self.inner.lock_state();
            state
                .registry
                .get_by_pid(pid)
                .map(|r| r.iteration)
                .ok_or(LaunchwatchError::ProcessNotFound(pid))?
        };

        let gateway = &self.inner.gateway;
        match gateway.is_alive(pid).await {
            Ok(false) => {
                self.inner.lock_state().registry.remove_by_pid(pid);
                info!(iteration, pid, "process already gone; record dropped");
                return Ok(TerminationOutcome::NotFound);
            }
            Ok(true) => {}
            Err(e) => {
                debug!(pid, error = %e, "liveness check failed; signalling anyway");
            }
        }

        gateway.signal(pid).await?;
        self.inner.lock_state().registry.remove_by_pid(pid);
        info!(iteration, pid, "termination signal sent; record removed");

        Ok(self.confirm_exit(pid).await)
    }

    async fn confirm_exit(&self, pid: ProcessId) -> TerminationOutcome {
        let TerminationSettings {
            poll_attempts,
            poll_interval,
        } = self.inner.termination;

        for attempt in 1..=poll_attempts {
            tokio::time::sleep(poll_interval).await;
            match self.inner.gateway.is_alive(pid).await {
                Ok(false) => {
                    debug!(pid, attempt, "termination confirmed");
                    return TerminationOutcome::ConfirmedDead;
                }
                Ok(true) => {}
                Err(e) => debug!(pid, attempt, error = %e, "liveness poll failed"),
            }
        }

        if poll_attempts > 0 {
            warn!(pid, attempts = poll_attempts, "process still alive after termination signal");
        }
        TerminationOutcome::SignalSentUnconfirmed
    }

    /// Cancel pending spawns, clear the registry, reset the batch and signal
    /// every instance that was registered.
    pub async fn terminate_all(&self) -> TerminateAllSummary {
        let records = {
            let mut state = self.inner.lock_state();
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            state.generation += 1;
            state.batch = LaunchBatch::idle();
            state.registry.drain()
        };

        let mut summary = TerminateAllSummary::default();
        for record in &records {
            match self.inner.gateway.signal(record.pid).await {
                Ok(()) => summary.terminated_count += 1,
                Err(e) => {
                    summary.failed_count += 1;
                    warn!(
                        iteration = record.iteration,
                        pid = record.pid,
                        error = %e,
                        "failed to signal instance during bulk terminate"
                    );
                }
            }
        }

        info!(
            terminated = summary.terminated_count,
            failed = summary.failed_count,
            "all instances cleared"
        );
        summary
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        let state = self.inner.lock_state();
        OrchestratorSnapshot {
            processes: state.registry.records().cloned().collect(),
            is_launching: state.batch.running,
            launch_status: state.batch,
            total_processes: state.registry.len(),
        }
    }

    pub fn status(&self) -> LaunchBatch {
        self.inner.lock_state().batch
    }

    /// `(total, running)` record counts.
    pub fn process_counts(&self) -> (usize, usize) {
        let state = self.inner.lock_state();
        (
            state.registry.len(),
            state.registry.count_with_status(LaunchStatus::Running),
        )
    }
}

async fn drive_batch<G: ProcessGateway>(
    inner: Arc<Inner<G>>,
    mut queue: LaunchQueue,
    generation: u64,
    final_iteration: u32,
) {
    // Each spawn runs on its own task so a slow spawn never delays the next.
    while let Some(launch) = queue.next_due().await {
        tokio::spawn(spawn_iteration(
            Arc::clone(&inner),
            launch,
            generation,
            final_iteration,
        ));
    }
    debug!(generation, "launch queue finished");
}

async fn spawn_iteration<G: ProcessGateway>(
    inner: Arc<Inner<G>>,
    launch: PendingLaunch,
    generation: u64,
    final_iteration: u32,
) {
    let iteration = launch.iteration;
    let request = SpawnRequest {
        path: inner.launcher.exe_path.clone(),
        args: inner.launcher.args.clone(),
    };

    let instance = match inner.gateway.spawn(request).await {
        Ok(instance) => instance,
        Err(e) => {
            warn!(iteration, error = %e, "spawn failed; continuing with the next iteration");
            return;
        }
    };
    let pid = instance.pid;

    let registered = {
        let mut state = inner.lock_state();
        // A bulk clear while the spawn call was in flight bumps the generation.
        !launch.is_cancelled()
            && state.generation == generation
            && state
                .registry
                .insert(LaunchRecord::running(iteration, pid, Utc::now()))
    };

    if !registered {
        warn!(iteration, pid, "batch cancelled during spawn; signalling unregistered instance");
        if let Err(e) = inner.gateway.signal(pid).await {
            warn!(iteration, pid, error = %e, "failed to signal unregistered instance");
        }
        return;
    }

    info!(iteration, pid, "instance launched");
    tokio::spawn(observe_instance(
        inner,
        instance,
        iteration,
        generation,
        final_iteration,
    ));
}
