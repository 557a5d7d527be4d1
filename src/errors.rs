// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::ProcessId;

#[derive(Error, Debug)]
pub enum LaunchwatchError {
    #[error("Invalid iteration count: {0}")]
    ValidationError(String),

    #[error("Launch already in progress")]
    ConcurrencyError,

    #[error("Process not found: {0}")]
    ProcessNotFound(ProcessId),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LaunchwatchError {
    /// Shorthand for wrapping an OS-boundary failure.
    pub fn gateway(msg: impl Into<String>) -> Self {
        LaunchwatchError::GatewayError(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LaunchwatchError>;
