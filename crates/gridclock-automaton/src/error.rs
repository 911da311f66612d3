//! Error types for the control core.
//!
//! Edit rejections are not errors: they are [`EditRejection`] values handled
//! inside the session. `SessionError` covers the store and configuration
//! paths, which can genuinely fail.
//!
//! [`EditRejection`]: gridclock_core::EditRejection

use std::path::PathBuf;

use gridclock_core::{ModelError, PresetSlot};
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while running a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The preset store could not complete a request.
    #[error("preset store error for slot {slot:?}: {message}")]
    Store {
        slot: Option<PresetSlot>,
        message: String,
    },

    /// A loaded preset breaks a row or graph invariant.
    #[error("preset in slot {slot} is invalid: {reason}")]
    InvalidPreset { slot: PresetSlot, reason: String },

    /// Engine timing configuration is unusable.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model value out of range.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file operations).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Store failure tied to a slot.
    pub fn store(slot: PresetSlot, message: impl Into<String>) -> Self {
        Self::Store {
            slot: Some(slot),
            message: message.into(),
        }
    }

    /// Preset invariant violation.
    pub fn invalid_preset(slot: PresetSlot, reason: impl Into<String>) -> Self {
        Self::InvalidPreset {
            slot,
            reason: reason.into(),
        }
    }
}
