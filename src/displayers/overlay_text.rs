//! Overlay text displayer
//!
//! The [`UpdateSink`] that turns reconciler updates into overlay text: it
//! resolves the slot from the current settings, formats the raw data through
//! the slot's template and pushes the result to the [`OverlayTarget`].
//! Identical consecutive text for a slot is pushed only once.

use crate::overlay::{render_value, resolve_slot};
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use sensor_overlay_core::{
    ListenerKind, OverlayId, OverlayTarget, OverlayUpdate, Result, SettingsStore, UpdateSink,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Text last pushed for one overlay; the async mutex orders pushes per slot
type TextCell = Arc<tokio::sync::Mutex<Option<String>>>;

/// Formats updates and pushes them to an overlay target
pub struct OverlayTextSink {
    settings: Arc<dyn SettingsStore>,
    target: Arc<dyn OverlayTarget>,
    shown: Mutex<HashMap<OverlayId, TextCell>>,
}

impl OverlayTextSink {
    pub fn new(settings: Arc<dyn SettingsStore>, target: Arc<dyn OverlayTarget>) -> Self {
        Self {
            settings,
            target,
            shown: Mutex::new(HashMap::new()),
        }
    }

    fn shown(&self) -> MutexGuard<'_, HashMap<OverlayId, TextCell>> {
        self.shown.lock().unwrap_or_else(|poisoned| {
            warn!("Overlay text map was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Text most recently pushed for `overlay_id`
    pub async fn current_text(&self, overlay_id: &OverlayId) -> Option<String> {
        let cell = self.shown().get(overlay_id).cloned()?;
        let text = cell.lock().await.clone();
        text
    }
}

#[async_trait]
impl UpdateSink for OverlayTextSink {
    async fn on_update(&self, update: OverlayUpdate) -> Result<()> {
        let slot = resolve_slot(self.settings.as_ref(), &update.overlay_id);
        let rendered = render_value(
            update.listener_kind,
            &update.raw_data,
            &slot,
            update.unit.as_deref(),
        );

        // Held across the push so two updates for one slot cannot reorder;
        // other slots push concurrently
        let cell = Arc::clone(self.shown().entry(update.overlay_id.clone()).or_default());
        let mut shown = cell.lock().await;
        let text = match rendered {
            Some(text) => text,
            // A detection without a face keeps whatever is showing
            None if update.listener_kind == ListenerKind::Face && shown.is_some() => {
                trace!("Overlay {}: no face detected, keeping text", update.overlay_id);
                return Ok(());
            }
            None => slot.static_text,
        };
        if shown.as_ref() == Some(&text) {
            trace!("Overlay {}: text unchanged, skipping push", update.overlay_id);
            return Ok(());
        }

        if update.suppress_log {
            trace!("Overlay {}: static text {:?}", update.overlay_id, text);
        } else {
            debug!(
                "Overlay {}: {} update from {} -> {:?}",
                update.overlay_id,
                update.listener_kind,
                update.source_device.as_deref().unwrap_or("-"),
                text
            );
        }

        self.target.set_text(&update.overlay_id, &text).await?;
        *shown = Some(text);
        Ok(())
    }
}

/// Overlay target that writes overlay text to the log
#[derive(Debug, Default)]
pub struct LoggingOverlayTarget;

#[async_trait]
impl OverlayTarget for LoggingOverlayTarget {
    async fn set_text(&self, overlay_id: &OverlayId, text: &str) -> Result<()> {
        info!("[overlay {}] {}", overlay_id, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettings;
    use sensor_overlay_core::OverlayError;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingTarget {
        pushed: StdMutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl OverlayTarget for RecordingTarget {
        async fn set_text(&self, overlay_id: &OverlayId, text: &str) -> Result<()> {
            if self.fail {
                return Err(OverlayError::Sink {
                    overlay: overlay_id.to_string(),
                    reason: "camera offline".to_string(),
                });
            }
            self.pushed
                .lock()
                .unwrap()
                .push((overlay_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn temperature(overlay: &OverlayId, value: f64) -> OverlayUpdate {
        OverlayUpdate {
            overlay_id: overlay.clone(),
            listener_kind: ListenerKind::Temperature,
            raw_data: json!(value),
            source_device: Some("thermo".to_string()),
            unit: Some("°C".to_string()),
            suppress_log: false,
        }
    }

    #[tokio::test]
    async fn test_formats_and_coalesces() {
        let settings = Arc::new(MemorySettings::from_validated([
            ("overlay:top:type", "Device"),
            ("overlay:top:device", "thermo"),
        ]));
        let target = Arc::new(RecordingTarget::default());
        let sink = OverlayTextSink::new(settings, target.clone());
        let top = OverlayId::new("top").unwrap();

        sink.on_update(temperature(&top, 21.04)).await.unwrap();
        sink.on_update(temperature(&top, 20.96)).await.unwrap();
        sink.on_update(temperature(&top, 22.5)).await.unwrap();

        assert_eq!(
            *target.pushed.lock().unwrap(),
            vec![
                ("top".to_string(), "21.0 °C".to_string()),
                ("top".to_string(), "22.5 °C".to_string()),
            ]
        );
        assert_eq!(sink.current_text(&top).await.as_deref(), Some("22.5 °C"));
    }

    #[tokio::test]
    async fn test_static_text_update() {
        let settings = Arc::new(MemorySettings::from_validated([("overlay:top:text", "Front door")]));
        let target = Arc::new(RecordingTarget::default());
        let sink = OverlayTextSink::new(settings, target.clone());
        let top = OverlayId::new("top").unwrap();

        sink.on_update(OverlayUpdate::static_text(top.clone(), "Front door"))
            .await
            .unwrap();
        assert_eq!(sink.current_text(&top).await.as_deref(), Some("Front door"));
    }

    #[tokio::test]
    async fn test_face_miss_keeps_previous_text() {
        let settings = Arc::new(MemorySettings::from_validated([
            ("overlay:face:type", "FaceDetection"),
            ("overlay:face:regex", "Hi ${value}"),
        ]));
        let target = Arc::new(RecordingTarget::default());
        let sink = OverlayTextSink::new(settings, target.clone());
        let face = OverlayId::new("face").unwrap();
        let detection = |payload| OverlayUpdate {
            overlay_id: face.clone(),
            listener_kind: ListenerKind::Face,
            raw_data: payload,
            source_device: Some("self".to_string()),
            unit: None,
            suppress_log: false,
        };

        sink.on_update(detection(json!({"detections": [{"className": "face", "label": "Alice"}]})))
            .await
            .unwrap();
        sink.on_update(detection(json!({"detections": []}))).await.unwrap();
        sink.on_update(detection(json!({"detections": [{"className": "dog", "label": "Rex"}]})))
            .await
            .unwrap();

        assert_eq!(
            *target.pushed.lock().unwrap(),
            vec![("face".to_string(), "Hi Alice".to_string())]
        );
    }

    /// Target that holds pushes for one overlay until released
    struct GatedTarget {
        gated: String,
        gate: Notify,
        pushed: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl OverlayTarget for GatedTarget {
        async fn set_text(&self, overlay_id: &OverlayId, text: &str) -> Result<()> {
            if overlay_id.as_str() == self.gated {
                self.gate.notified().await;
            }
            self.pushed.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_slot_does_not_block_others() {
        let settings = Arc::new(MemorySettings::new());
        let target = Arc::new(GatedTarget {
            gated: "slow".to_string(),
            gate: Notify::new(),
            pushed: StdMutex::new(Vec::new()),
        });
        let sink = Arc::new(OverlayTextSink::new(settings, target.clone()));
        let slow = OverlayId::new("slow").unwrap();
        let fast = OverlayId::new("fast").unwrap();

        let pending = Arc::clone(&sink);
        let slow_push = tokio::spawn(async move {
            pending
                .on_update(OverlayUpdate::static_text(slow, "Waiting"))
                .await
        });
        tokio::task::yield_now().await;

        tokio::time::timeout(
            Duration::from_secs(1),
            sink.on_update(OverlayUpdate::static_text(fast.clone(), "Ready")),
        )
        .await
        .expect("push for another slot was blocked")
        .unwrap();
        assert_eq!(*target.pushed.lock().unwrap(), vec!["Ready".to_string()]);

        target.gate.notify_one();
        slow_push.await.unwrap().unwrap();
        assert_eq!(target.pushed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_push_is_not_remembered() {
        let settings = Arc::new(MemorySettings::new());
        let target = Arc::new(RecordingTarget {
            fail: true,
            ..Default::default()
        });
        let sink = OverlayTextSink::new(settings, target);
        let top = OverlayId::new("top").unwrap();

        assert!(sink.on_update(temperature(&top, 20.0)).await.is_err());
        assert_eq!(sink.current_text(&top).await, None);
    }
}
