#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use launchwatch::config::model::default_connection_markers;
use launchwatch::config::{LauncherSettings, TerminationSettings};
use launchwatch::correlate::DiscoveredProcess;
use launchwatch::types::{LaunchRecord, LaunchStatus, ProcessId};

/// Marker used by tests that do not care about the real marker list.
pub const READY_MARKER: &str = "Exeluncher connected to MMLineker";

/// Builder for `LauncherSettings` to simplify test setup.
pub struct LauncherSettingsBuilder {
    settings: LauncherSettings,
}

impl LauncherSettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: LauncherSettings {
                exe_path: PathBuf::from("EL.exe"),
                args: vec![],
                launch_delay: Duration::from_secs(60),
                confirmation_delay: Duration::from_secs(2),
                connection_markers: default_connection_markers(),
            },
        }
    }

    pub fn exe_path(mut self, path: &str) -> Self {
        self.settings.exe_path = PathBuf::from(path);
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.settings.args.push(arg.to_string());
        self
    }

    pub fn launch_delay(mut self, delay: Duration) -> Self {
        self.settings.launch_delay = delay;
        self
    }

    pub fn confirmation_delay(mut self, delay: Duration) -> Self {
        self.settings.confirmation_delay = delay;
        self
    }

    pub fn markers(mut self, markers: &[&str]) -> Self {
        self.settings.connection_markers = markers.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn build(self) -> LauncherSettings {
        self.settings
    }
}

impl Default for LauncherSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Termination polling: `attempts` checks, `interval` apart.
pub fn termination(attempts: u32, interval: Duration) -> TerminationSettings {
    TerminationSettings {
        poll_attempts: attempts,
        poll_interval: interval,
    }
}

/// `t0 + secs` seconds, with `t0` the Unix epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
}

/// Running record started `secs` seconds after the epoch.
pub fn record(iteration: u32, pid: ProcessId, secs: i64) -> LaunchRecord {
    LaunchRecord::running(iteration, pid, at(secs))
}

pub fn connected_record(iteration: u32, pid: ProcessId, secs: i64) -> LaunchRecord {
    LaunchRecord {
        status: LaunchStatus::Connected,
        connected: true,
        ..record(iteration, pid, secs)
    }
}

/// Builder for `DiscoveredProcess`.
pub struct DiscoveredBuilder {
    process: DiscoveredProcess,
}

impl DiscoveredBuilder {
    pub fn new(pid: ProcessId) -> Self {
        Self {
            process: DiscoveredProcess {
                pid,
                app_name: "TownClient.exe".to_string(),
                streaming_id: "Unknown".to_string(),
                streaming_port: None,
                command_line: "TownClient.exe -PixelStreamingURL=ws://127.0.0.1:8888".to_string(),
                discovered_at: at(0),
            },
        }
    }

    pub fn streaming_id(mut self, id: &str) -> Self {
        self.process.streaming_id = id.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.process.streaming_port = Some(port);
        self
    }

    pub fn app_name(mut self, name: &str) -> Self {
        self.process.app_name = name.to_string();
        self
    }

    pub fn build(self) -> DiscoveredProcess {
        self.process
    }
}

/// Shorthand for a discovered process with only pid and streaming id set.
pub fn discovered(pid: ProcessId, streaming_id: &str) -> DiscoveredProcess {
    DiscoveredBuilder::new(pid).streaming_id(streaming_id).build()
}
