//! sensor-overlay-types: Shared data types for sensor-overlay.
//!
//! This crate contains pure data types (slot descriptors, listener kinds,
//! typed settings keys, settings field metadata, detection payloads) that are
//! shared across all sensor-overlay crates. Nothing in here performs I/O.

pub mod detection;
pub mod field;
pub mod key;
pub mod listener;
pub mod overlay;

// Re-export commonly used types at the crate root for convenience
pub use detection::{DetectionResult, ObjectDetection};
pub use field::{SettingField, SettingFieldType};
pub use key::{KeyError, OverlayField, OverlayId, SettingKey};
pub use listener::{Capability, EventKind, ListenerKind};
pub use overlay::{OverlayKind, OverlaySlot, DEFAULT_MAX_DECIMALS, DEFAULT_TEMPLATE};
