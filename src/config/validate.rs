// src/config/validate.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, LauncherSection, LauncherSettings, RawConfigFile, ServerSection, ServerSettings,
    TerminationSection, TerminationSettings, TrackerSection, TrackerSettings,
};
use crate::errors::{LaunchwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::LaunchwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let launcher = raw.launcher.as_ref().map(validate_launcher).transpose()?;
        let termination = validate_termination(&raw.termination)?;
        let server = validate_server(&raw.server)?;
        let tracker = validate_tracker(&raw.tracker)?;

        Ok(ConfigFile::new_unchecked(launcher, termination, server, tracker))
    }
}

fn validate_launcher(section: &LauncherSection) -> Result<LauncherSettings> {
    if section.exe_path.trim().is_empty() {
        return Err(LaunchwatchError::ConfigError(
            "[launcher].exe_path must not be empty".to_string(),
        ));
    }

    if section.connection_markers.is_empty() {
        return Err(LaunchwatchError::ConfigError(
            "[launcher].connection_markers must contain at least one marker".to_string(),
        ));
    }

    if let Some(idx) = section
        .connection_markers
        .iter()
        .position(|m| m.is_empty())
    {
        // An empty marker would match every chunk of output.
        return Err(LaunchwatchError::ConfigError(format!(
            "[launcher].connection_markers[{idx}] is empty"
        )));
    }

    Ok(LauncherSettings {
        exe_path: PathBuf::from(&section.exe_path),
        args: section.args.clone(),
        launch_delay: nonzero_duration_field("launcher", "launch_delay", &section.launch_delay)?,
        confirmation_delay: duration_field(
            "launcher",
            "confirmation_delay",
            &section.confirmation_delay,
        )?,
        connection_markers: section.connection_markers.clone(),
    })
}

fn validate_termination(section: &TerminationSection) -> Result<TerminationSettings> {
    Ok(TerminationSettings {
        poll_attempts: section.poll_attempts,
        poll_interval: duration_field("termination", "poll_interval", &section.poll_interval)?,
    })
}

fn validate_server(section: &ServerSection) -> Result<ServerSettings> {
    let bind: SocketAddr = section.bind.trim().parse().map_err(|e| {
        LaunchwatchError::ConfigError(format!(
            "[server].bind '{}' is not a socket address: {e}",
            section.bind
        ))
    })?;
    Ok(ServerSettings { bind })
}

fn validate_tracker(section: &TrackerSection) -> Result<TrackerSettings> {
    if section.keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(LaunchwatchError::ConfigError(
            "[tracker].keywords must contain at least one non-empty keyword".to_string(),
        ));
    }

    let server_url = section.server_url.trim().trim_end_matches('/').to_string();
    if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
        return Err(LaunchwatchError::ConfigError(format!(
            "[tracker].server_url must be an http(s) URL (got '{}')",
            section.server_url
        )));
    }

    Ok(TrackerSettings {
        server_url,
        keywords: section
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .cloned()
            .collect(),
        interval: nonzero_duration_field("tracker", "interval", &section.interval)?,
    })
}

fn duration_field(section: &str, field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| {
        LaunchwatchError::ConfigError(format!("[{section}].{field} = '{value}': {e}"))
    })
}

fn nonzero_duration_field(section: &str, field: &str, value: &str) -> Result<Duration> {
    let duration = duration_field(section, field, value)?;
    if duration.is_zero() {
        return Err(LaunchwatchError::ConfigError(format!(
            "[{section}].{field} = '{value}': must be greater than zero"
        )));
    }
    Ok(duration)
}
