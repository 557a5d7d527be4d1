// src/exec/gateway.rs

//! Pluggable process gateway abstraction.
//!
//! The orchestrator and the tracker talk to a `ProcessGateway` instead of
//! touching `tokio::process` or the OS tools directly. Production code uses
//! [`RealProcessGateway`](super::RealProcessGateway); tests can provide their
//! own implementation that never spawns a real process.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use crate::errors::Result;
use crate::types::ProcessId;

/// Boxed future returned by every gateway operation.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What to run for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub path: PathBuf,
    pub args: Vec<String>,
}

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One chunk (line) of output emitted by a spawned instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// How a spawned instance ended. `code` is `None` when killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceExit {
    pub code: Option<i32>,
}

/// Handle to a freshly spawned instance.
///
/// The instance itself is not owned here: it keeps running independently,
/// and only its output and exit are observable through the channels.
#[derive(Debug)]
pub struct SpawnedInstance {
    pub pid: ProcessId,
    pub output: mpsc::Receiver<OutputChunk>,
    pub exit: oneshot::Receiver<InstanceExit>,
}

/// A process as listed by the OS process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: ProcessId,
    pub command_line: String,
}

/// Trait abstracting every interaction with OS processes.
pub trait ProcessGateway: Send + Sync + 'static {
    /// Spawn `request.path` with `request.args`, streaming its output.
    fn spawn(&self, request: SpawnRequest) -> GatewayFuture<'_, SpawnedInstance>;

    /// Send a termination signal. Returns once the signal was issued; it does
    /// not wait for the process to die.
    fn signal(&self, pid: ProcessId) -> GatewayFuture<'_, ()>;

    /// Whether `pid` is still present in the OS process table.
    fn is_alive(&self, pid: ProcessId) -> GatewayFuture<'_, bool>;

    /// List processes whose command line contains any of `keywords`.
    fn query(&self, keywords: Vec<String>) -> GatewayFuture<'_, Vec<ProcessEntry>>;
}
