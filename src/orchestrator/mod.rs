// src/orchestrator/mod.rs

//! Staggered launch orchestration.
//!
//! This module ties together:
//! - the launch record registry ([`registry`])
//! - the cancellable spawn queue ([`schedule`])
//! - per-instance output observers ([`observer`])
//! - the shared orchestrator handle used by the HTTP layer ([`launcher`])
//!
//! All mutable state sits behind one mutex inside [`LaunchOrchestrator`];
//! the observers and the batch driver only ever touch it through short,
//! non-async critical sections.

use serde::{Deserialize, Serialize};

use crate::types::{LaunchBatch, LaunchRecord};

/// What `start_batch` hands back before any spawn has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchReceipt {
    pub start_iteration: u32,
    pub iterations: u32,
    /// Registry size once every queued spawn has been registered.
    pub total_processes: usize,
}

/// Consistent view of the orchestrator, as served by `GET /api/processes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorSnapshot {
    #[serde(default)]
    pub processes: Vec<LaunchRecord>,
    #[serde(default)]
    pub is_launching: bool,
    #[serde(default)]
    pub launch_status: LaunchBatch,
    #[serde(default)]
    pub total_processes: usize,
}

pub mod launcher;
pub mod observer;
pub mod registry;
pub mod schedule;

pub use launcher::LaunchOrchestrator;
pub use registry::ProcessRegistry;
pub use schedule::{CancelHandle, CancelToken, LaunchQueue, PendingLaunch, cancel_pair};
