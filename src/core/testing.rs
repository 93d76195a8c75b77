//! Test doubles shared by the core tests

use crate::sources::SimulatedRegistry;
use async_trait::async_trait;
use sensor_overlay_core::{
    Capability, Device, DeviceRegistry, EventCallback, EventKind, OverlayError, OverlayUpdate, Result,
    Subscription, UpdateSink,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Sink that keeps every update it receives
#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<OverlayUpdate>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<OverlayUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
    }
}

#[async_trait]
impl UpdateSink for RecordingSink {
    async fn on_update(&self, update: OverlayUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}

/// Thermometer whose subscriptions always fail
pub struct BrokenDevice(pub String);

#[async_trait]
impl Device for BrokenDevice {
    fn id(&self) -> &str {
        &self.0
    }

    fn capabilities(&self) -> HashSet<Capability> {
        HashSet::from([Capability::Thermometer])
    }

    async fn subscribe(&self, kind: EventKind, _callback: EventCallback) -> Result<Box<dyn Subscription>> {
        Err(OverlayError::Subscribe {
            device: self.0.clone(),
            kind,
            reason: "device offline".to_string(),
        })
    }

    async fn current_value(&self, _kind: EventKind) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Simulated registry plus devices that are not simulated
pub struct MixedRegistry {
    pub simulated: Arc<SimulatedRegistry>,
    pub extra: Vec<Arc<dyn Device>>,
}

impl DeviceRegistry for MixedRegistry {
    fn resolve(&self, device_id: &str) -> Option<Arc<dyn Device>> {
        self.extra
            .iter()
            .find(|device| device.id() == device_id)
            .cloned()
            .or_else(|| self.simulated.resolve(device_id))
    }
}
