// src/exec/real.rs

//! Production gateway over `tokio::process` and the platform's process tools.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{LaunchwatchError, Result};
use crate::exec::gateway::{
    GatewayFuture, InstanceExit, OutputChunk, OutputStream, ProcessEntry, ProcessGateway,
    SpawnRequest, SpawnedInstance,
};
use crate::exec::listing::{filter_by_keywords, parse_ps_listing, parse_wmic_listing};
use crate::types::ProcessId;

/// Buffered output chunks per instance before the pump waits on the observer.
const OUTPUT_BUFFER: usize = 256;

/// Real gateway used in production.
#[derive(Debug, Clone, Default)]
pub struct RealProcessGateway;

impl RealProcessGateway {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessGateway for RealProcessGateway {
    fn spawn(&self, request: SpawnRequest) -> GatewayFuture<'_, SpawnedInstance> {
        Box::pin(spawn_instance(request))
    }

    fn signal(&self, pid: ProcessId) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let pid_s = pid.to_string();
            let output = if cfg!(windows) {
                run_tool("taskkill", &["/PID", &pid_s, "/T", "/F"]).await?
            } else {
                run_tool("kill", &["-TERM", &pid_s]).await?
            };

            if !output.status.success() {
                return Err(LaunchwatchError::gateway(format!(
                    "termination signal for pid {pid} failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }

            debug!(pid, "termination signal sent");
            Ok(())
        })
    }

    fn is_alive(&self, pid: ProcessId) -> GatewayFuture<'_, bool> {
        Box::pin(async move {
            let pid_s = pid.to_string();
            if cfg!(windows) {
                let filter = format!("PID eq {pid_s}");
                let output = run_tool("tasklist", &["/FI", &filter, "/NH"]).await?;
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(stdout
                    .lines()
                    .any(|line| line.split_whitespace().nth(1) == Some(pid_s.as_str())))
            } else {
                // Signal 0 performs the existence/permission check only.
                let output = run_tool("kill", &["-0", &pid_s]).await?;
                Ok(output.status.success())
            }
        })
    }

    fn query(&self, keywords: Vec<String>) -> GatewayFuture<'_, Vec<ProcessEntry>> {
        Box::pin(async move {
            let entries = if cfg!(windows) {
                let output = run_tool(
                    "wmic",
                    &[
                        "process",
                        "where",
                        "name IS NOT NULL",
                        "get",
                        "ProcessId,CommandLine",
                        "/format:list",
                    ],
                )
                .await?;
                ensure_success("wmic", &output)?;
                parse_wmic_listing(&String::from_utf8_lossy(&output.stdout))
            } else {
                let output = run_tool("ps", &["-eo", "pid=,args="]).await?;
                ensure_success("ps", &output)?;
                parse_ps_listing(&String::from_utf8_lossy(&output.stdout))
            };

            let matched = filter_by_keywords(entries, &keywords);
            debug!(matched = matched.len(), ?keywords, "process table queried");
            Ok(matched)
        })
    }
}

async fn spawn_instance(request: SpawnRequest) -> Result<SpawnedInstance> {
    // Bare command names are resolved through PATH by the OS; only explicit
    // paths are checked up front.
    if looks_like_path(&request.path) && tokio::fs::metadata(&request.path).await.is_err() {
        return Err(LaunchwatchError::gateway(format!(
            "executable path not found: {}",
            request.path.display()
        )));
    }

    info!(
        path = %request.path.display(),
        args = ?request.args,
        "spawning instance"
    );

    let mut cmd = Command::new(&request.path);
    cmd.args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    let mut child = cmd.spawn().map_err(|e| {
        LaunchwatchError::gateway(format!("spawning '{}': {e}", request.path.display()))
    })?;

    let pid = child
        .id()
        .ok_or_else(|| LaunchwatchError::gateway("spawned process has no pid"))?;

    let (output_tx, output_rx) = mpsc::channel(OUTPUT_BUFFER);
    if let Some(stdout) = child.stdout.take() {
        spawn_output_pump(stdout, OutputStream::Stdout, pid, output_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_output_pump(stderr, OutputStream::Stderr, pid, output_tx);
    }

    let (exit_tx, exit_rx) = oneshot::channel();
    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(pid, error = %e, "failed waiting for instance");
                None
            }
        };
        info!(pid, exit_code = ?code, "instance exited");
        let _ = exit_tx.send(InstanceExit { code });
    });

    Ok(SpawnedInstance {
        pid,
        output: output_rx,
        exit: exit_rx,
    })
}

/// Forward every line of `pipe` as an [`OutputChunk`].
///
/// Lines are decoded lossily so a stray non-UTF-8 byte does not end the
/// stream. If the observer goes away the pipe is still drained so the child
/// never blocks on a full buffer.
fn spawn_output_pump<R>(
    pipe: R,
    stream: OutputStream,
    pid: ProcessId,
    tx: mpsc::Sender<OutputChunk>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        let mut forward = true;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if !forward {
                        continue;
                    }
                    let text = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send(OutputChunk { stream, text }).await.is_err() {
                        debug!(pid, ?stream, "output observer gone; draining");
                        forward = false;
                    }
                }
                Err(e) => {
                    debug!(pid, ?stream, error = %e, "output pipe read failed");
                    break;
                }
            }
        }

        debug!(pid, ?stream, "output pump ended");
    });
}

async fn run_tool(tool: &str, args: &[&str]) -> Result<std::process::Output> {
    Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| LaunchwatchError::gateway(format!("running {tool}: {e}")))
}

fn ensure_success(tool: &str, output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(LaunchwatchError::gateway(format!(
            "{tool} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

fn looks_like_path(path: &Path) -> bool {
    path.is_absolute() || path.components().count() > 1
}
