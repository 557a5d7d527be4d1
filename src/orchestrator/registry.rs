// src/orchestrator/registry.rs

//! In-memory registry of launch records.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::types::{LaunchRecord, LaunchStatus, ProcessId};

/// Active launch records keyed by iteration.
///
/// The registry also remembers the highest iteration it has ever held, so
/// iteration numbers keep increasing after records are removed or cleared.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    records: BTreeMap<u32, LaunchRecord>,
    highest_iteration: u32,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iteration number the next batch starts at.
    pub fn next_iteration(&self) -> u32 {
        self.highest_iteration + 1
    }

    /// Register a freshly spawned instance.
    ///
    /// Returns `false` (and leaves the registry unchanged) if the iteration is
    /// already taken.
    pub fn insert(&mut self, record: LaunchRecord) -> bool {
        if self.records.contains_key(&record.iteration) {
            warn!(
                iteration = record.iteration,
                pid = record.pid,
                "iteration already registered; ignoring duplicate"
            );
            return false;
        }

        self.highest_iteration = self.highest_iteration.max(record.iteration);
        debug!(iteration = record.iteration, pid = record.pid, "record registered");
        self.records.insert(record.iteration, record);
        true
    }

    pub fn get_by_pid(&self, pid: ProcessId) -> Option<&LaunchRecord> {
        self.records.values().find(|r| r.pid == pid)
    }

    pub fn remove_by_pid(&mut self, pid: ProcessId) -> Option<LaunchRecord> {
        let iteration = self.get_by_pid(pid)?.iteration;
        self.records.remove(&iteration)
    }

    /// Running → Connected for the record at `iteration`, if it still belongs
    /// to `pid` and has not transitioned before.
    pub fn mark_connected(&mut self, iteration: u32, pid: ProcessId) -> bool {
        match self.records.get_mut(&iteration) {
            Some(record) if record.pid == pid && record.status == LaunchStatus::Running => {
                record.status = LaunchStatus::Connected;
                record.connected = true;
                true
            }
            _ => false,
        }
    }

    /// Mark the record as Terminated after its process exited by itself.
    /// The `connected` flag is left as it was.
    pub fn mark_exited(&mut self, iteration: u32, pid: ProcessId) -> bool {
        match self.records.get_mut(&iteration) {
            Some(record) if record.pid == pid && record.status != LaunchStatus::Terminated => {
                record.status = LaunchStatus::Terminated;
                true
            }
            _ => false,
        }
    }

    /// Remove and return every record, in iteration order.
    pub fn drain(&mut self) -> Vec<LaunchRecord> {
        std::mem::take(&mut self.records).into_values().collect()
    }

    /// Records in iteration order.
    pub fn records(&self) -> impl Iterator<Item = &LaunchRecord> {
        self.records.values()
    }

    pub fn count_with_status(&self, status: LaunchStatus) -> usize {
        self.records.values().filter(|r| r.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(iteration: u32, pid: ProcessId) -> LaunchRecord {
        LaunchRecord::running(iteration, pid, Utc::now())
    }

    #[test]
    fn next_iteration_starts_at_one() {
        assert_eq!(ProcessRegistry::new().next_iteration(), 1);
    }

    #[test]
    fn iterations_are_not_reused_after_removal_or_drain() {
        let mut registry = ProcessRegistry::new();
        registry.insert(record(1, 100));
        registry.insert(record(2, 101));

        registry.remove_by_pid(101);
        assert_eq!(registry.next_iteration(), 3);

        registry.drain();
        assert!(registry.is_empty());
        assert_eq!(registry.next_iteration(), 3);
    }

    #[test]
    fn duplicate_iteration_is_rejected() {
        let mut registry = ProcessRegistry::new();
        assert!(registry.insert(record(1, 100)));
        assert!(!registry.insert(record(1, 555)));
        assert_eq!(registry.get_by_pid(100).map(|r| r.iteration), Some(1));
        assert!(registry.get_by_pid(555).is_none());
    }

    #[test]
    fn connect_transition_happens_once_and_checks_pid() {
        let mut registry = ProcessRegistry::new();
        registry.insert(record(1, 100));

        assert!(!registry.mark_connected(1, 999));
        assert!(registry.mark_connected(1, 100));
        assert!(!registry.mark_connected(1, 100));

        let r = registry.get_by_pid(100).unwrap();
        assert_eq!(r.status, LaunchStatus::Connected);
        assert!(r.connected);
    }

    #[test]
    fn exited_record_cannot_connect_afterwards() {
        let mut registry = ProcessRegistry::new();
        registry.insert(record(4, 100));

        assert!(registry.mark_exited(4, 100));
        assert!(!registry.mark_connected(4, 100));
        assert_eq!(registry.count_with_status(LaunchStatus::Terminated), 1);
    }

    #[test]
    fn remove_by_pid_leaves_others_intact() {
        let mut registry = ProcessRegistry::new();
        registry.insert(record(1, 100));
        registry.insert(record(2, 101));
        registry.insert(record(3, 102));

        let removed = registry.remove_by_pid(101).unwrap();
        assert_eq!(removed.iteration, 2);

        let left: Vec<_> = registry.records().map(|r| r.pid).collect();
        assert_eq!(left, vec![100, 102]);
        assert!(registry.remove_by_pid(101).is_none());
    }
}
