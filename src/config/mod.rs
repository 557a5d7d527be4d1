// src/config/mod.rs

//! Configuration loading and validation for launchwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into typed settings (`validate.rs`), parsing duration
//!   strings with [`duration::parse_duration`].

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, LauncherSection, LauncherSettings, RawConfigFile, ServerSection, ServerSettings,
    TerminationSection, TerminationSettings, TrackerSection, TrackerSettings,
};
