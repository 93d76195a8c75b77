//! Overlay slot descriptors

use crate::key::OverlayId;
use serde::{Deserialize, Serialize};

/// Template used when a slot has none configured
pub const DEFAULT_TEMPLATE: &str = "${value} ${unit}";

/// Fractional digits used when a slot has none configured
pub const DEFAULT_MAX_DECIMALS: u32 = 1;

/// What feeds an overlay slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OverlayKind {
    #[serde(rename = "Text")]
    #[default]
    StaticText,
    #[serde(rename = "Device")]
    BoundDevice,
    #[serde(rename = "FaceDetection")]
    FaceDetection,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 3] = [
        OverlayKind::StaticText,
        OverlayKind::BoundDevice,
        OverlayKind::FaceDetection,
    ];

    /// Value stored under the slot's `type` key
    pub fn storage_name(self) -> &'static str {
        match self {
            OverlayKind::StaticText => "Text",
            OverlayKind::BoundDevice => "Device",
            OverlayKind::FaceDetection => "FaceDetection",
        }
    }

    /// Parse a stored `type` value; unknown values fall back to static text
    pub fn from_storage(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.storage_name() == value)
            .unwrap_or_else(|| {
                log::debug!("Unknown overlay type {:?}, using static text", value);
                OverlayKind::StaticText
            })
    }
}

/// Typed view of one overlay slot's settings.
///
/// Every field is always populated; only the ones relevant to `kind` are
/// meaningful. Stale values left over from a previous kind are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySlot {
    pub id: OverlayId,
    pub kind: OverlayKind,
    pub template: String,
    pub static_text: String,
    pub bound_device_id: Option<String>,
    pub max_decimals: u32,
}

impl OverlaySlot {
    /// Slot with default settings
    pub fn new(id: OverlayId) -> Self {
        Self {
            id,
            kind: OverlayKind::default(),
            template: DEFAULT_TEMPLATE.to_string(),
            static_text: String::new(),
            bound_device_id: None,
            max_decimals: DEFAULT_MAX_DECIMALS,
        }
    }

    /// Bound device id, only when the slot is actually bound to a device
    pub fn device_binding(&self) -> Option<&str> {
        match self.kind {
            OverlayKind::BoundDevice => self.bound_device_id.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_round_trip() {
        for kind in OverlayKind::ALL {
            assert_eq!(OverlayKind::from_storage(kind.storage_name()), kind);
        }
        assert_eq!(OverlayKind::from_storage("Banner"), OverlayKind::StaticText);
    }

    #[test]
    fn test_device_binding_shadowed_by_kind() {
        let mut slot = OverlaySlot::new(OverlayId::new("a").unwrap());
        slot.bound_device_id = Some("thermo".to_string());
        assert_eq!(slot.device_binding(), None);

        slot.kind = OverlayKind::BoundDevice;
        assert_eq!(slot.device_binding(), Some("thermo"));
    }
}
