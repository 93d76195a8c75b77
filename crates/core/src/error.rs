//! Error taxonomy for overlay reconciliation

use sensor_overlay_types::{EventKind, KeyError};
use thiserror::Error;

pub type Result<T, E = OverlayError> = std::result::Result<T, E>;

/// Everything that can go wrong while reconciling or pushing one slot.
///
/// None of these are fatal: the reconciler logs them per slot and carries on.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("invalid settings key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("device {0:?} not found in registry")]
    UnresolvedDevice(String),

    #[error("failed to subscribe to {kind:?} events on {device}: {reason}")]
    Subscribe {
        device: String,
        kind: EventKind,
        reason: String,
    },

    #[error("failed to read current {kind:?} value of {device}: {reason}")]
    CurrentValue {
        device: String,
        kind: EventKind,
        reason: String,
    },

    #[error("update sink rejected update for overlay {overlay}: {reason}")]
    Sink { overlay: String, reason: String },

    #[error("settings store error: {0}")]
    Settings(String),
}
