//! Update sink and overlay target

use crate::error::Result;
use async_trait::async_trait;
use sensor_overlay_types::{ListenerKind, OverlayId};
use serde::Serialize;
use serde_json::Value;

/// One update for an overlay slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayUpdate {
    pub overlay_id: OverlayId,
    pub listener_kind: ListenerKind,
    /// Raw event payload or current reading
    pub raw_data: Value,
    /// Id of the device the data came from
    pub source_device: Option<String>,
    /// Unit reported by the source device
    pub unit: Option<String>,
    /// Not event driven, nothing worth logging
    pub suppress_log: bool,
}

impl OverlayUpdate {
    /// Update pushing a slot's static text
    pub fn static_text(overlay_id: OverlayId, text: impl Into<String>) -> Self {
        Self {
            overlay_id,
            listener_kind: ListenerKind::None,
            raw_data: Value::String(text.into()),
            source_device: None,
            unit: None,
            suppress_log: true,
        }
    }
}

/// Receives overlay updates from the reconciler.
///
/// Only the latest update per overlay matters; implementations may coalesce.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn on_update(&self, update: OverlayUpdate) -> Result<()>;
}

/// The actual video overlay text call
#[async_trait]
pub trait OverlayTarget: Send + Sync {
    async fn set_text(&self, overlay_id: &OverlayId, text: &str) -> Result<()>;
}
