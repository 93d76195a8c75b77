//! sensor-overlay: keeps camera text overlays bound to live sensor readings
//!
//! This library provides:
//! - The listener reconciler that pairs overlay slots with device subscriptions
//! - Overlay slot resolution and template formatting
//! - The overlay text displayer
//! - Configuration and simulated devices

pub mod config;
pub mod core;
pub mod displayers;
pub mod overlay;
pub mod sources;

// Re-export commonly used types
pub use config::{AppConfig, MemorySettings};
pub use core::{ListenerReconciler, ReconcileReport, UpdateManager};
pub use displayers::{LoggingOverlayTarget, OverlayTextSink};
