//! Error types for the somewhere substrate.

use thiserror::Error;

/// Errors that can occur in the substrate layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Slot payload serialization/deserialization failed
    #[error("Serialization error in slot '{slot}': {reason}")]
    SerializationError { slot: String, reason: String },
}

impl EnvError {
    /// Creates a serialization error for a slot.
    pub fn serialization(slot: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SerializationError {
            slot: slot.into(),
            reason: reason.to_string(),
        }
    }
}
