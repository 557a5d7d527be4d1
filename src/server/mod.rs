// src/server/mod.rs

//! HTTP API over a shared [`LaunchOrchestrator`].
//!
//! | Route                        | Handler            |
//! |------------------------------|--------------------|
//! | `POST   /api/launch`         | [`launch`]         |
//! | `GET    /api/processes`      | [`list_processes`] |
//! | `DELETE /api/process/{pid}`  | [`terminate_one`]  |
//! | `DELETE /api/processes/all`  | [`terminate_all`]  |
//! | `GET    /api/status`         | [`status`]         |
//! | `GET    /health`             | [`health`]         |

pub mod error;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use crate::errors::{LaunchwatchError, Result};
use crate::exec::ProcessGateway;
use crate::orchestrator::{LaunchOrchestrator, OrchestratorSnapshot};
use crate::types::{LaunchBatch, ProcessId, TerminationOutcome};

pub use error::ApiError;

/// Shared handler state.
pub struct AppState<G: ProcessGateway> {
    pub orchestrator: LaunchOrchestrator<G>,
    started: Instant,
}

type SharedState<G> = State<Arc<AppState<G>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchRequest {
    #[serde(default)]
    pub iterations: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResponse {
    pub message: String,
    pub iterations: u32,
    pub start_iteration: u32,
    pub total_processes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateResponse {
    pub message: String,
    pub outcome: TerminationOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateAllResponse {
    pub message: String,
    pub terminated_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub processes: ProcessCounts,
    pub version: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProcessCounts {
    pub total: usize,
    pub running: usize,
}

/// Build the API router.
pub fn router<G: ProcessGateway>(orchestrator: LaunchOrchestrator<G>) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        started: Instant::now(),
    });

    Router::new()
        .route("/api/launch", post(launch::<G>))
        .route("/api/processes", get(list_processes::<G>))
        .route("/api/process/{pid}", delete(terminate_one::<G>))
        .route("/api/processes/all", delete(terminate_all::<G>))
        .route("/api/status", get(status::<G>))
        .route("/health", get(health::<G>))
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<G, F>(listener: TcpListener, orchestrator: LaunchOrchestrator<G>, shutdown: F) -> Result<()>
where
    G: ProcessGateway,
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP API listening");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP API stopped");
    Ok(())
}

pub async fn launch<G: ProcessGateway>(
    State(state): SharedState<G>,
    body: std::result::Result<Json<LaunchRequest>, JsonRejection>,
) -> std::result::Result<Json<LaunchResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let iterations = request.iterations.ok_or_else(|| {
        LaunchwatchError::ValidationError("missing \"iterations\" field".to_string())
    })?;

    let receipt = state.orchestrator.start_batch(iterations)?;
    Ok(Json(LaunchResponse {
        message: "Launch started".to_string(),
        iterations: receipt.iterations,
        start_iteration: receipt.start_iteration,
        total_processes: receipt.total_processes,
    }))
}

pub async fn list_processes<G: ProcessGateway>(
    State(state): SharedState<G>,
) -> Json<OrchestratorSnapshot> {
    Json(state.orchestrator.snapshot())
}

pub async fn terminate_one<G: ProcessGateway>(
    State(state): SharedState<G>,
    Path(raw_pid): Path<String>,
) -> std::result::Result<Json<TerminateResponse>, ApiError> {
    // A pid that does not parse cannot belong to any record.
    let pid: ProcessId = raw_pid
        .trim()
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Process not found: {raw_pid}")))?;
    let outcome = state.orchestrator.terminate(pid).await?;

    let message = match outcome {
        TerminationOutcome::ConfirmedDead => "Process terminated",
        TerminationOutcome::SignalSentUnconfirmed => "Termination signal sent",
        TerminationOutcome::NotFound => "Process already exited",
    };
    Ok(Json(TerminateResponse {
        message: message.to_string(),
        outcome,
    }))
}

pub async fn terminate_all<G: ProcessGateway>(
    State(state): SharedState<G>,
) -> Json<TerminateAllResponse> {
    let summary = state.orchestrator.terminate_all().await;
    Json(TerminateAllResponse {
        message: "All processes terminated".to_string(),
        terminated_count: summary.terminated_count,
        failed_count: summary.failed_count,
    })
}

pub async fn status<G: ProcessGateway>(State(state): SharedState<G>) -> Json<LaunchBatch> {
    Json(state.orchestrator.status())
}

pub async fn health<G: ProcessGateway>(State(state): SharedState<G>) -> Json<HealthResponse> {
    let (total, running) = state.orchestrator.process_counts();
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.started.elapsed().as_secs(),
        processes: ProcessCounts { total, running },
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
