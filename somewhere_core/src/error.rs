//! Error types for somewhere strategies.

use somewhere_env::EnvError;
use thiserror::Error;

/// Invalid strategy parameters, rejected before any round runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Replica count must be at least 2, got {0}")]
    TooFewReplicas(usize),

    #[error("Information speed must be positive and finite, got {0}")]
    InvalidInfoSpeed(f64),

    #[error("Diameter bound must be positive and finite, got {0}")]
    InvalidDiameter(f64),

    #[error("Election patience must be positive and finite, got {0}")]
    InvalidPatience(f64),
}

/// Errors a strategy can return from a round.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Substrate error: {0}")]
    Env(#[from] EnvError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
