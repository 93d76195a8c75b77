//! Simulated sensor devices
//!
//! In-memory devices with configurable capabilities and readings. Events are
//! delivered synchronously from [`SimulatedDevice::emit`], and every
//! subscribe/release is written to a journal shared by the whole registry so
//! callers can check exactly what happened and in which order.

use async_trait::async_trait;
use sensor_overlay_core::{
    Capability, Device, DeviceRegistry, EventCallback, EventKind, OverlayError, Result,
    Subscription,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

fn default_period() -> f64 {
    60.0
}

/// Oscillation applied to a simulated reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    /// Peak deviation from the base reading
    pub amplitude: f64,
    /// Wave period in seconds
    #[serde(default = "default_period")]
    pub period: f64,
}

impl Oscillation {
    /// Sine wave around `base` at `elapsed`
    pub fn value_at(&self, base: f64, elapsed: Duration) -> f64 {
        if self.period <= 0.0 {
            return base;
        }
        let phase = elapsed.as_secs_f64() / self.period * 2.0 * PI;
        base + self.amplitude * phase.sin()
    }
}

/// Description of a simulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Temperature unit, e.g. "°C"
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub oscillation: Option<Oscillation>,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            id: id.into(),
            name: None,
            capabilities,
            unit: None,
            temperature: None,
            humidity: None,
            oscillation: None,
        }
    }
}

/// One subscribe or release, as recorded in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Subscribed { device: String, kind: EventKind },
    Released { device: String, kind: EventKind },
}

type Journal = Arc<Mutex<Vec<SubscriptionEvent>>>;
type Subscribers = Arc<Mutex<HashMap<u64, (EventKind, EventCallback)>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Simulated device mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

struct SimulatedSubscription {
    id: u64,
    device_id: String,
    kind: EventKind,
    subscribers: Subscribers,
    journal: Journal,
}

impl Subscription for SimulatedSubscription {
    fn release(&mut self) {
        if lock(&self.subscribers).remove(&self.id).is_some() {
            lock(&self.journal).push(SubscriptionEvent::Released {
                device: self.device_id.clone(),
                kind: self.kind,
            });
        }
    }
}

/// An in-memory device
pub struct SimulatedDevice {
    id: String,
    name: String,
    unit: Option<String>,
    capabilities: RwLock<HashSet<Capability>>,
    readings: RwLock<HashMap<EventKind, Value>>,
    oscillation: Option<Oscillation>,
    subscribers: Subscribers,
    next_subscription: AtomicU64,
    journal: Journal,
}

impl SimulatedDevice {
    fn new(config: DeviceConfig, journal: Journal) -> Self {
        let mut readings = HashMap::new();
        if let Some(temperature) = config.temperature {
            readings.insert(EventKind::Temperature, Value::from(temperature));
        }
        if let Some(humidity) = config.humidity {
            readings.insert(EventKind::Humidity, Value::from(humidity));
        }

        Self {
            name: config.name.unwrap_or_else(|| config.id.clone()),
            id: config.id,
            unit: config.unit,
            capabilities: RwLock::new(config.capabilities.into_iter().collect()),
            readings: RwLock::new(readings),
            oscillation: config.oscillation,
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_subscription: AtomicU64::new(1),
            journal,
        }
    }

    /// Standalone device with its own journal
    pub fn standalone(config: DeviceConfig) -> Arc<Self> {
        Arc::new(Self::new(config, Journal::default()))
    }

    pub fn set_capabilities(&self, capabilities: impl IntoIterator<Item = Capability>) {
        let mut current = self.capabilities.write().unwrap_or_else(|p| p.into_inner());
        *current = capabilities.into_iter().collect();
    }

    /// Callbacks subscribed to `kind`, collected so none runs under the lock
    fn callbacks_for(&self, kind: EventKind) -> Vec<EventCallback> {
        lock(&self.subscribers)
            .values()
            .filter(|(subscribed, _)| *subscribed == kind)
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    /// Record a new reading and deliver it to every matching subscriber
    pub fn emit(&self, kind: EventKind, value: Value) {
        if kind != EventKind::ObjectDetection {
            let mut readings = self.readings.write().unwrap_or_else(|p| p.into_inner());
            readings.insert(kind, value.clone());
        }

        let callbacks = self.callbacks_for(kind);
        log::trace!("{}: emitting {:?} to {} subscriber(s)", self.id, kind, callbacks.len());
        for callback in callbacks {
            callback(value.clone());
        }
    }

    /// Advance oscillating readings to `elapsed` and emit them
    pub fn tick(&self, elapsed: Duration) {
        let Some(oscillation) = self.oscillation else {
            return;
        };
        let bases: Vec<(EventKind, f64)> = {
            let readings = self.readings.read().unwrap_or_else(|p| p.into_inner());
            readings
                .iter()
                .filter_map(|(kind, value)| value.as_f64().map(|v| (*kind, v)))
                .collect()
        };
        for (kind, base) in bases {
            let value = (oscillation.value_at(base, elapsed) * 100.0).round() / 100.0;
            for callback in self.callbacks_for(kind) {
                callback(Value::from(value));
            }
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

#[async_trait]
impl Device for SimulatedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> HashSet<Capability> {
        self.capabilities
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn temperature_unit(&self) -> Option<String> {
        self.unit.clone()
    }

    async fn subscribe(&self, kind: EventKind, callback: EventCallback) -> Result<Box<dyn Subscription>> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).insert(id, (kind, callback));
        lock(&self.journal).push(SubscriptionEvent::Subscribed {
            device: self.id.clone(),
            kind,
        });
        log::debug!("{}: subscription {} for {:?}", self.id, id, kind);

        Ok(Box::new(SimulatedSubscription {
            id,
            device_id: self.id.clone(),
            kind,
            subscribers: Arc::clone(&self.subscribers),
            journal: Arc::clone(&self.journal),
        }))
    }

    async fn current_value(&self, kind: EventKind) -> Result<Option<Value>> {
        if !self.capabilities().contains(&kind.capability()) {
            return Err(OverlayError::CurrentValue {
                device: self.id.clone(),
                kind,
                reason: format!("device has no {:?} capability", kind.capability()),
            });
        }
        let readings = self.readings.read().unwrap_or_else(|p| p.into_inner());
        Ok(readings.get(&kind).cloned())
    }
}

/// Registry of simulated devices
#[derive(Default)]
pub struct SimulatedRegistry {
    devices: RwLock<HashMap<String, Arc<SimulatedDevice>>>,
    journal: Journal,
}

impl SimulatedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: impl IntoIterator<Item = DeviceConfig>) -> Self {
        let registry = Self::new();
        for config in configs {
            registry.add_device(config);
        }
        registry
    }

    /// Create a device sharing this registry's journal and register it
    pub fn add_device(&self, config: DeviceConfig) -> Arc<SimulatedDevice> {
        let device = Arc::new(SimulatedDevice::new(config, Arc::clone(&self.journal)));
        let mut devices = self.devices.write().unwrap_or_else(|p| p.into_inner());
        if devices.insert(device.id.clone(), Arc::clone(&device)).is_some() {
            log::warn!("Replaced simulated device {}", device.id);
        }
        device
    }

    /// Create a device sharing this registry's journal without registering it
    pub fn detached_device(&self, config: DeviceConfig) -> Arc<SimulatedDevice> {
        Arc::new(SimulatedDevice::new(config, Arc::clone(&self.journal)))
    }

    pub fn remove_device(&self, device_id: &str) -> Option<Arc<SimulatedDevice>> {
        let mut devices = self.devices.write().unwrap_or_else(|p| p.into_inner());
        devices.remove(device_id)
    }

    pub fn device(&self, device_id: &str) -> Option<Arc<SimulatedDevice>> {
        let devices = self.devices.read().unwrap_or_else(|p| p.into_inner());
        devices.get(device_id).cloned()
    }

    pub fn all_devices(&self) -> Vec<Arc<SimulatedDevice>> {
        let devices = self.devices.read().unwrap_or_else(|p| p.into_inner());
        devices.values().cloned().collect()
    }

    /// Every subscribe/release so far, in order
    pub fn journal(&self) -> Vec<SubscriptionEvent> {
        lock(&self.journal).clone()
    }

    /// Drop the journal, e.g. between test phases
    pub fn clear_journal(&self) {
        lock(&self.journal).clear();
    }
}

impl DeviceRegistry for SimulatedRegistry {
    fn resolve(&self, device_id: &str) -> Option<Arc<dyn Device>> {
        self.device(device_id).map(|device| device as Arc<dyn Device>)
    }
}
