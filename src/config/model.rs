// src/config/model.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [launcher]
/// exe_path = "C:\\apps\\EL.exe"
/// launch_delay = "60s"
/// confirmation_delay = "2s"
/// connection_markers = ["Exeluncher connected to MMLineker"]
///
/// [termination]
/// poll_attempts = 10
/// poll_interval = "200ms"
///
/// [server]
/// bind = "0.0.0.0:3000"
///
/// [tracker]
/// server_url = "http://127.0.0.1:3000"
/// ```
///
/// Every section except `[launcher]` has defaults. `[launcher]` is only
/// required when actually serving (the tracker can run without it).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub launcher: Option<LauncherSection>,

    #[serde(default)]
    pub termination: TerminationSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub tracker: TrackerSection,
}

/// `[launcher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LauncherSection {
    /// Executable spawned once per iteration.
    pub exe_path: String,

    /// Arguments passed to every spawn. Empty by default.
    #[serde(default)]
    pub args: Vec<String>,

    /// Delay between the starts of two successive spawns (e.g. `"60s"`).
    #[serde(default = "default_launch_delay")]
    pub launch_delay: String,

    /// How long to wait after the final iteration connects before the batch
    /// is reported as finished.
    #[serde(default = "default_confirmation_delay")]
    pub confirmation_delay: String,

    /// Exact substrings that signal a successful downstream handshake.
    #[serde(default = "default_connection_markers")]
    pub connection_markers: Vec<String>,
}

fn default_launch_delay() -> String {
    "60s".to_string()
}

fn default_confirmation_delay() -> String {
    "2s".to_string()
}

pub fn default_connection_markers() -> Vec<String> {
    vec![
        "ioClient4MMLineker--> Exeluncher message recieved".to_string(),
        "you are conneted to MMLineker.js as exeluncher".to_string(),
        "Exeluncher connected to MMLineker".to_string(),
    ]
}

/// `[termination]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminationSection {
    /// Liveness checks after a termination signal. `0` disables polling.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval() -> String {
    "200ms".to_string()
}

impl Default for TerminationSection {
    fn default() -> Self {
        Self {
            poll_attempts: default_poll_attempts(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// `[tracker]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerSection {
    /// Base URL of the server whose `/api/processes` is read.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// A process is considered downstream if its command line contains any
    /// of these.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Refresh interval in continuous mode.
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_keywords() -> Vec<String> {
    vec![
        "PixelStreamingURL".to_string(),
        "PixelStreamingPort".to_string(),
        "PixelStreamingID".to_string(),
    ]
}

fn default_interval() -> String {
    "30s".to_string()
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            keywords: default_keywords(),
            interval: default_interval(),
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub launcher: Option<LauncherSettings>,
    pub termination: TerminationSettings,
    pub server: ServerSettings,
    pub tracker: TrackerSettings,
}

impl ConfigFile {
    /// Assemble an already-validated config. Only `validate.rs` calls this.
    pub(crate) fn new_unchecked(
        launcher: Option<LauncherSettings>,
        termination: TerminationSettings,
        server: ServerSettings,
        tracker: TrackerSettings,
    ) -> Self {
        Self {
            launcher,
            termination,
            server,
            tracker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSettings {
    pub exe_path: PathBuf,
    pub args: Vec<String>,
    pub launch_delay: Duration,
    pub confirmation_delay: Duration,
    pub connection_markers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationSettings {
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for TerminationSettings {
    fn default() -> Self {
        Self {
            poll_attempts: default_poll_attempts(),
            poll_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub server_url: String,
    pub keywords: Vec<String>,
    pub interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            keywords: default_keywords(),
            interval: Duration::from_secs(30),
        }
    }
}
