//! Listener bindings - desired vs current pairing of a slot to an event source

use sensor_overlay_core::{
    Device, DeviceRegistry, EventKind, ListenerKind, OverlayError, OverlayId, OverlayKind,
    OverlaySlot, SubscriptionHandle, SELF_DEVICE_ID,
};
use serde::Serialize;
use std::sync::Arc;

/// Binding a slot should have, computed fresh on every pass
#[derive(Clone)]
pub struct DesiredBinding {
    pub kind: ListenerKind,
    /// Device id recorded for the binding (`SELF_DEVICE_ID` for faces)
    pub device_id: Option<String>,
    /// Device to subscribe on
    pub device: Option<Arc<dyn Device>>,
}

impl DesiredBinding {
    pub fn none() -> Self {
        Self {
            kind: ListenerKind::None,
            device_id: None,
            device: None,
        }
    }
}

impl std::fmt::Debug for DesiredBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesiredBinding")
            .field("kind", &self.kind)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Compute the binding a slot should have right now.
///
/// A bound device that cannot be found, or that has neither a temperature nor
/// a humidity capability, resolves to no listener for this pass.
pub fn resolve_binding(
    slot: &OverlaySlot,
    registry: &dyn DeviceRegistry,
    camera: &Arc<dyn Device>,
) -> DesiredBinding {
    match slot.kind {
        OverlayKind::StaticText => DesiredBinding::none(),
        OverlayKind::BoundDevice => {
            let Some(device_id) = slot.device_binding() else {
                log::warn!("Overlay {}: no device configured", slot.id);
                return DesiredBinding::none();
            };
            let Some(device) = registry.resolve(device_id) else {
                log::warn!(
                    "Overlay {}: {}",
                    slot.id,
                    OverlayError::UnresolvedDevice(device_id.to_string())
                );
                return DesiredBinding::none();
            };

            let kind = ListenerKind::for_capabilities(&device.capabilities());
            if kind.is_none() {
                log::warn!(
                    "Overlay {}: device {} has no temperature or humidity capability",
                    slot.id,
                    device_id
                );
                return DesiredBinding::none();
            }

            DesiredBinding {
                kind,
                device_id: Some(device_id.to_string()),
                device: Some(device),
            }
        }
        OverlayKind::FaceDetection => DesiredBinding {
            kind: ListenerKind::Face,
            device_id: Some(SELF_DEVICE_ID.to_string()),
            device: Some(Arc::clone(camera)),
        },
    }
}

/// Whether the current binding must be replaced or dropped.
///
/// Only the listener kind counts, plus the device id for bound-device slots;
/// template and decimals changes never touch the subscription.
pub fn needs_change(
    current: Option<(ListenerKind, &str)>,
    desired: &DesiredBinding,
    slot_kind: OverlayKind,
) -> bool {
    match current {
        None => !desired.kind.is_none(),
        Some((kind, device_id)) => {
            kind != desired.kind
                || (slot_kind == OverlayKind::BoundDevice
                    && desired.device_id.as_deref() != Some(device_id))
        }
    }
}

/// A live binding owned by the reconciler
pub struct ActiveBinding {
    pub kind: ListenerKind,
    pub device: Arc<dyn Device>,
    pub handle: SubscriptionHandle,
}

impl ActiveBinding {
    /// Device id recorded for the binding (`SELF_DEVICE_ID` for faces)
    pub fn device_id(&self) -> &str {
        self.handle.device_id()
    }

    /// Unit to attach to updates from this binding
    pub fn unit(&self) -> Option<String> {
        match self.kind {
            ListenerKind::Temperature => self.device.temperature_unit(),
            _ => None,
        }
    }

    pub fn event_kind(&self) -> EventKind {
        self.handle.kind()
    }
}

/// Diagnostic view of one live binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingSnapshot {
    pub overlay_id: OverlayId,
    pub kind: ListenerKind,
    pub device_id: String,
    pub token: u64,
}

/// What one slot's reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    Unchanged,
    Subscribed { replaced: bool },
    Released,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub subscribed: usize,
    pub released: usize,
    pub unchanged: usize,
    pub failed: Vec<(OverlayId, String)>,
}

impl ReconcileReport {
    pub fn record(&mut self, outcome: SlotOutcome) {
        match outcome {
            SlotOutcome::Unchanged => self.unchanged += 1,
            SlotOutcome::Subscribed { replaced } => {
                self.subscribed += 1;
                if replaced {
                    self.released += 1;
                }
            }
            SlotOutcome::Released => self.released += 1,
        }
    }

    /// No subscribe or release happened
    pub fn is_quiet(&self) -> bool {
        self.subscribed == 0 && self.released == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{DeviceConfig, SimulatedRegistry};
    use sensor_overlay_core::Capability;

    fn slot(kind: OverlayKind, device: Option<&str>) -> OverlaySlot {
        let mut slot = OverlaySlot::new(OverlayId::new("s").unwrap());
        slot.kind = kind;
        slot.bound_device_id = device.map(str::to_string);
        slot
    }

    fn fixture() -> (SimulatedRegistry, Arc<dyn Device>) {
        let registry = SimulatedRegistry::from_configs([
            DeviceConfig::new("both", vec![Capability::HumiditySensor, Capability::Thermometer]),
            DeviceConfig::new("humid", vec![Capability::HumiditySensor]),
            DeviceConfig::new("plain", vec![]),
        ]);
        let camera: Arc<dyn Device> =
            registry.detached_device(DeviceConfig::new("camera", vec![Capability::ObjectDetector]));
        (registry, camera)
    }

    #[test]
    fn test_resolution_per_kind() {
        let (registry, camera) = fixture();

        let desired = resolve_binding(&slot(OverlayKind::BoundDevice, Some("both")), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::Temperature);
        assert_eq!(desired.device_id.as_deref(), Some("both"));

        let desired = resolve_binding(&slot(OverlayKind::BoundDevice, Some("humid")), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::Humidity);

        let desired = resolve_binding(&slot(OverlayKind::BoundDevice, Some("plain")), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::None);

        let desired = resolve_binding(&slot(OverlayKind::FaceDetection, Some("both")), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::Face);
        assert_eq!(desired.device_id.as_deref(), Some(SELF_DEVICE_ID));

        let desired = resolve_binding(&slot(OverlayKind::StaticText, Some("both")), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::None);
    }

    #[test]
    fn test_missing_device_resolves_to_none() {
        let (registry, camera) = fixture();
        let desired = resolve_binding(&slot(OverlayKind::BoundDevice, Some("gone")), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::None);
        assert!(desired.device.is_none());

        let desired = resolve_binding(&slot(OverlayKind::BoundDevice, None), &registry, &camera);
        assert_eq!(desired.kind, ListenerKind::None);
    }

    #[test]
    fn test_needs_change() {
        let temp_on = |id: &str| DesiredBinding {
            kind: ListenerKind::Temperature,
            device_id: Some(id.to_string()),
            device: None,
        };

        assert!(!needs_change(None, &DesiredBinding::none(), OverlayKind::StaticText));
        assert!(needs_change(None, &temp_on("a"), OverlayKind::BoundDevice));
        assert!(!needs_change(
            Some((ListenerKind::Temperature, "a")),
            &temp_on("a"),
            OverlayKind::BoundDevice
        ));
        assert!(needs_change(
            Some((ListenerKind::Temperature, "a")),
            &temp_on("b"),
            OverlayKind::BoundDevice
        ));
        assert!(needs_change(
            Some((ListenerKind::Temperature, "a")),
            &DesiredBinding::none(),
            OverlayKind::StaticText
        ));

        let face = DesiredBinding {
            kind: ListenerKind::Face,
            device_id: Some(SELF_DEVICE_ID.to_string()),
            device: None,
        };
        assert!(!needs_change(
            Some((ListenerKind::Face, SELF_DEVICE_ID)),
            &face,
            OverlayKind::FaceDetection
        ));
    }

    #[test]
    fn test_report_counts() {
        let mut report = ReconcileReport::default();
        report.record(SlotOutcome::Unchanged);
        assert!(report.is_quiet());
        report.record(SlotOutcome::Subscribed { replaced: true });
        report.record(SlotOutcome::Released);
        assert_eq!((report.subscribed, report.released, report.unchanged), (1, 2, 1));
    }
}
