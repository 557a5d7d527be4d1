use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OS-level process identifier as reported by the gateway.
pub type ProcessId = u32;

/// Lifecycle state of one launched instance.
///
/// - `Running`: spawned, no connection marker seen yet.
/// - `Connected`: a connection marker was observed on stdout.
/// - `Terminated`: the instance exited on its own while still registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchStatus {
    Running,
    Connected,
    Terminated,
}

impl Default for LaunchStatus {
    fn default() -> Self {
        LaunchStatus::Running
    }
}

/// Bookkeeping entry for one spawned instance.
///
/// The serialized form is what `GET /api/processes` returns, and what the
/// tracker reads back from a remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRecord {
    pub iteration: u32,
    pub pid: ProcessId,
    #[serde(default)]
    pub status: LaunchStatus,
    #[serde(default)]
    pub connected: bool,
    pub start_time: DateTime<Utc>,
}

impl LaunchRecord {
    pub fn running(iteration: u32, pid: ProcessId, start_time: DateTime<Utc>) -> Self {
        Self {
            iteration,
            pid,
            status: LaunchStatus::Running,
            connected: false,
            start_time,
        }
    }
}

/// State of the current (or last) launch batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchBatch {
    #[serde(rename = "total")]
    pub total_requested: u32,
    #[serde(rename = "completed")]
    pub completed_count: u32,
    pub running: bool,
    pub start_iteration: u32,
}

impl LaunchBatch {
    /// The state reported when no batch has been started (or after a reset).
    pub fn idle() -> Self {
        Self {
            total_requested: 0,
            completed_count: 0,
            running: false,
            start_iteration: 1,
        }
    }

    /// Last iteration number belonging to this batch.
    pub fn final_iteration(&self) -> u32 {
        self.start_iteration + self.total_requested.saturating_sub(1)
    }
}

impl Default for LaunchBatch {
    fn default() -> Self {
        LaunchBatch::idle()
    }
}

/// Result of terminating a single registered instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// The signal was sent and a liveness poll saw the process disappear.
    ConfirmedDead,
    /// The signal was sent but the process was still alive after polling.
    SignalSentUnconfirmed,
    /// The process was already gone from the OS process table; no signal sent.
    NotFound,
}

/// Summary returned by a bulk terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateAllSummary {
    /// Signals successfully issued (not confirmed deaths).
    pub terminated_count: usize,
    pub failed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_record_uses_wire_field_names() {
        let record = LaunchRecord::running(3, 4242, DateTime::<Utc>::UNIX_EPOCH);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["iteration"], 3);
        assert_eq!(json["pid"], 4242);
        assert_eq!(json["status"], "running");
        assert_eq!(json["connected"], false);
        assert!(json["startTime"].is_string());
    }

    #[test]
    fn launch_batch_serializes_like_status_endpoint() {
        let json = serde_json::to_value(LaunchBatch::idle()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total": 0,
                "completed": 0,
                "running": false,
                "startIteration": 1
            })
        );
    }

    #[test]
    fn final_iteration_spans_batch() {
        let batch = LaunchBatch {
            total_requested: 3,
            completed_count: 0,
            running: true,
            start_iteration: 5,
        };
        assert_eq!(batch.final_iteration(), 7);
    }
}
