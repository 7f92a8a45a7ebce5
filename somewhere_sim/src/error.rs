//! Error types for the simulator.

use somewhere_core::ConfigError;
use somewhere_env::DeviceId;
use thiserror::Error;

/// Errors from building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid strategy configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid simulation configuration: {0}")]
    InvalidSim(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Batch run failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SimError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidSim(reason.into())
    }
}
