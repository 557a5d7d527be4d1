// src/orchestrator/observer.rs

//! Per-instance output observer.
//!
//! One observer task runs for every registered instance. It feeds stdout
//! chunks to the connection detector, logs stderr, and marks the record
//! Terminated once the instance exits by itself.

use std::sync::Arc;

use tracing::{debug, info};

use crate::exec::{InstanceExit, OutputChunk, OutputStream, ProcessGateway, SpawnedInstance};
use crate::types::ProcessId;

use super::launcher::Inner;

pub(super) async fn observe_instance<G: ProcessGateway>(
    inner: Arc<Inner<G>>,
    mut instance: SpawnedInstance,
    iteration: u32,
    generation: u64,
    final_iteration: u32,
) {
    let pid = instance.pid;
    let mut observer = Observer {
        inner,
        iteration,
        pid,
        generation,
        final_iteration,
        connected: false,
    };
    let mut output_open = true;

    let exit = loop {
        tokio::select! {
            chunk = instance.output.recv(), if output_open => match chunk {
                Some(chunk) => observer.on_output(&chunk),
                None => output_open = false,
            },
            exit = &mut instance.exit => break exit.ok(),
        }
    };

    // Lines written right before exit may still be queued.
    while let Ok(chunk) = instance.output.try_recv() {
        observer.on_output(&chunk);
    }

    observer.on_exit(exit);
}

struct Observer<G> {
    inner: Arc<Inner<G>>,
    iteration: u32,
    pid: ProcessId,
    generation: u64,
    final_iteration: u32,
    connected: bool,
}

impl<G: ProcessGateway> Observer<G> {
    fn on_output(&mut self, chunk: &OutputChunk) {
        let (iteration, pid) = (self.iteration, self.pid);
        match chunk.stream {
            OutputStream::Stderr => debug!(iteration, pid, "stderr: {}", chunk.text),
            OutputStream::Stdout => {
                debug!(iteration, pid, "stdout: {}", chunk.text);
                if !self.connected && self.inner.detector.is_connected(&chunk.text) {
                    self.connected = true;
                    self.on_connected();
                }
            }
        }
    }

    fn on_connected(&self) {
        let (iteration, pid, generation) = (self.iteration, self.pid, self.generation);

        let batch_finished = {
            let mut state = self.inner.lock_state();
            if !state.registry.mark_connected(iteration, pid) {
                debug!(iteration, pid, "connection marker for a record no longer running");
                return;
            }

            let current = state.generation == generation && state.batch.running;
            if current {
                state.batch.completed_count += 1;
            }
            info!(
                iteration,
                pid,
                completed = state.batch.completed_count,
                total = state.batch.total_requested,
                "instance connected"
            );
            current && iteration == self.final_iteration
        };

        if !batch_finished {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let delay = inner.launcher.confirmation_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = inner.lock_state();
            if state.generation == generation && state.batch.running {
                state.batch.running = false;
                info!(
                    completed = state.batch.completed_count,
                    total = state.batch.total_requested,
                    "launch batch finished"
                );
            }
        });
    }

    fn on_exit(&self, exit: Option<InstanceExit>) {
        let (iteration, pid) = (self.iteration, self.pid);
        let code = exit.and_then(|e| e.code);

        let mut state = self.inner.lock_state();
        if state.registry.mark_exited(iteration, pid) {
            info!(iteration, pid, exit_code = ?code, "instance exited; record marked terminated");
        } else {
            debug!(iteration, pid, exit_code = ?code, "unregistered instance exited");
        }
    }
}
