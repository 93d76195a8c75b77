//! Built-in displayers
//!
//! Displayers turn reconciler updates into what the camera shows.

mod overlay_text;

pub use overlay_text::{LoggingOverlayTarget, OverlayTextSink};
