//! sensor-overlay-core: Collaborator traits for sensor-overlay.
//!
//! This crate contains the seams the reconciler talks through (device
//! registry, settings store, update sink, overlay target), the error
//! taxonomy, and shared constants.

pub mod constants;
mod device;
mod error;
mod settings;
mod sink;

pub use constants::{
    DEFAULT_UPDATE_INTERVAL_MS, HUMIDITY_UNIT, MAX_FORMAT_DECIMALS, SELF_DEVICE_ID,
};
pub use device::{Device, DeviceRegistry, EventCallback, Subscription, SubscriptionHandle};
pub use error::{OverlayError, Result};
pub use settings::SettingsStore;
pub use sink::{OverlayTarget, OverlayUpdate, UpdateSink};

// Re-export types used in trait signatures for convenience
pub use sensor_overlay_types::{
    Capability, EventKind, ListenerKind, OverlayField, OverlayId, OverlayKind, OverlaySlot,
    SettingKey,
};
