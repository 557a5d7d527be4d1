use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use launchwatch::errors::LaunchwatchError;
use launchwatch::exec::listing::filter_by_keywords;
use launchwatch::exec::{
    GatewayFuture, InstanceExit, OutputChunk, ProcessEntry, ProcessGateway, SpawnRequest,
    SpawnedInstance,
};
use launchwatch::types::ProcessId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// First pid handed out by a fresh [`FakeGateway`].
pub const FIRST_PID: ProcessId = 1000;

/// One call to `spawn`, successful or not.
#[derive(Debug, Clone)]
pub struct SpawnCall {
    pub request: SpawnRequest,
    /// Tokio clock at the moment the call was made.
    pub at: Instant,
    /// `None` when the call was configured to fail.
    pub pid: Option<ProcessId>,
}

/// A gateway that never touches the OS:
/// - spawns hand out sequential pids and record the call
/// - tests push output and exits into instances by pid
/// - signals are recorded and (by default) kill the fake instance
/// - `query` filters a configurable process table
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    next_pid: Option<ProcessId>,
    spawn_latency: Duration,
    spawns: Vec<SpawnCall>,
    failing_spawn_calls: BTreeSet<usize>,
    instances: HashMap<ProcessId, FakeInstance>,
    alive: BTreeSet<ProcessId>,
    signalled: Vec<ProcessId>,
    failing_signals: BTreeSet<ProcessId>,
    surviving: BTreeSet<ProcessId>,
    process_table: Vec<ProcessEntry>,
}

struct FakeInstance {
    output: Option<mpsc::Sender<OutputChunk>>,
    exit: Option<oneshot::Sender<InstanceExit>>,
}

impl FakeState {
    fn finish(&mut self, pid: ProcessId, code: Option<i32>) -> bool {
        let was_alive = self.alive.remove(&pid);
        if let Some(instance) = self.instances.get_mut(&pid) {
            instance.output = None;
            if let Some(tx) = instance.exit.take() {
                let _ = tx.send(InstanceExit { code });
            }
        }
        was_alive
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th spawn call (1-based) fail.
    pub fn fail_spawn_call(&self, n: usize) {
        self.state.lock().unwrap().failing_spawn_calls.insert(n);
    }

    /// Every spawn call takes `latency` (on the tokio clock) before returning.
    pub fn set_spawn_latency(&self, latency: Duration) {
        self.state.lock().unwrap().spawn_latency = latency;
    }

    /// Signals to `pid` return an error.
    pub fn fail_signal(&self, pid: ProcessId) {
        self.state.lock().unwrap().failing_signals.insert(pid);
    }

    /// Signals to `pid` succeed but the process stays alive.
    pub fn survive_signal(&self, pid: ProcessId) {
        self.state.lock().unwrap().surviving.insert(pid);
    }

    pub fn set_process_table(&self, entries: Vec<ProcessEntry>) {
        self.state.lock().unwrap().process_table = entries;
    }

    pub fn spawn_calls(&self) -> Vec<SpawnCall> {
        self.state.lock().unwrap().spawns.clone()
    }

    pub fn spawned_pids(&self) -> Vec<ProcessId> {
        self.state
            .lock()
            .unwrap()
            .spawns
            .iter()
            .filter_map(|c| c.pid)
            .collect()
    }

    pub fn signalled(&self) -> Vec<ProcessId> {
        self.state.lock().unwrap().signalled.clone()
    }

    pub fn is_running(&self, pid: ProcessId) -> bool {
        self.state.lock().unwrap().alive.contains(&pid)
    }

    /// Push a stdout line into a running instance.
    pub async fn emit_stdout(&self, pid: ProcessId, text: &str) -> bool {
        self.emit(pid, OutputChunk::stdout(text)).await
    }

    pub async fn emit_stderr(&self, pid: ProcessId, text: &str) -> bool {
        self.emit(pid, OutputChunk::stderr(text)).await
    }

    async fn emit(&self, pid: ProcessId, chunk: OutputChunk) -> bool {
        let tx = {
            let state = self.state.lock().unwrap();
            state.instances.get(&pid).and_then(|i| i.output.clone())
        };
        match tx {
            Some(tx) => tx.send(chunk).await.is_ok(),
            None => false,
        }
    }

    /// The instance exits by itself with `code`.
    pub fn exit(&self, pid: ProcessId, code: Option<i32>) -> bool {
        self.state.lock().unwrap().finish(pid, code)
    }
}

impl ProcessGateway for FakeGateway {
    fn spawn(&self, request: SpawnRequest) -> GatewayFuture<'_, SpawnedInstance> {
        Box::pin(async move {
            let (latency, pid) = {
                let mut state = self.state.lock().unwrap();
                let call_no = state.spawns.len() + 1;
                let fails = state.failing_spawn_calls.contains(&call_no);
                let pid = if fails {
                    None
                } else {
                    let pid = state.next_pid.unwrap_or(FIRST_PID);
                    state.next_pid = Some(pid + 1);
                    Some(pid)
                };
                state.spawns.push(SpawnCall {
                    request,
                    at: Instant::now(),
                    pid,
                });
                (state.spawn_latency, pid)
            };

            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let Some(pid) = pid else {
                return Err(LaunchwatchError::gateway("fake spawn failure"));
            };

            let mut state = self.state.lock().unwrap();
            let (output_tx, output_rx) = mpsc::channel(64);
            let (exit_tx, exit_rx) = oneshot::channel();
            state.instances.insert(
                pid,
                FakeInstance {
                    output: Some(output_tx),
                    exit: Some(exit_tx),
                },
            );
            state.alive.insert(pid);

            Ok(SpawnedInstance {
                pid,
                output: output_rx,
                exit: exit_rx,
            })
        })
    }

    fn signal(&self, pid: ProcessId) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.signalled.push(pid);
            if state.failing_signals.contains(&pid) {
                return Err(LaunchwatchError::gateway(format!("fake signal failure for {pid}")));
            }
            if !state.surviving.contains(&pid) {
                state.finish(pid, None);
            }
            Ok(())
        })
    }

    fn is_alive(&self, pid: ProcessId) -> GatewayFuture<'_, bool> {
        Box::pin(async move { Ok(self.state.lock().unwrap().alive.contains(&pid)) })
    }

    fn query(&self, keywords: Vec<String>) -> GatewayFuture<'_, Vec<ProcessEntry>> {
        Box::pin(async move {
            let table = self.state.lock().unwrap().process_table.clone();
            Ok(filter_by_keywords(table, &keywords))
        })
    }
}
