// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that touches real OS processes lives behind the
//! [`ProcessGateway`] trait:
//!
//! - [`gateway`] defines the trait and the handle/record types.
//! - [`real`] is the production implementation (`tokio::process` for spawning
//!   and output streaming; `kill`/`ps` or `taskkill`/`tasklist`/`wmic` for
//!   signals, liveness and process-table queries).
//! - [`listing`] parses process-table listings into [`ProcessEntry`] values.

pub mod gateway;
pub mod listing;
pub mod real;

pub use gateway::{
    GatewayFuture, InstanceExit, OutputChunk, OutputStream, ProcessEntry, ProcessGateway,
    SpawnRequest, SpawnedInstance,
};
pub use real::RealProcessGateway;
