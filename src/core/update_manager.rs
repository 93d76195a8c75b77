//! Update manager for scheduling reconciliation passes

use super::binding::ReconcileReport;
use super::reconciler::ListenerReconciler;
use log::trace;
use sensor_overlay_types::OverlayId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};

/// Drives a [`ListenerReconciler`] on a fixed cadence, with an immediate
/// extra pass whenever settings change
pub struct UpdateManager {
    reconciler: Arc<ListenerReconciler>,
    overlay_ids: Vec<OverlayId>,
    settings_changed: Notify,
}

impl UpdateManager {
    /// Create a new update manager
    pub fn new(reconciler: Arc<ListenerReconciler>, overlay_ids: Vec<OverlayId>) -> Self {
        Self {
            reconciler,
            overlay_ids,
            settings_changed: Notify::new(),
        }
    }

    pub fn reconciler(&self) -> &Arc<ListenerReconciler> {
        &self.reconciler
    }

    pub fn overlay_ids(&self) -> &[OverlayId] {
        &self.overlay_ids
    }

    /// Schedule an immediate pass (coalesced with any pending one)
    pub fn notify_settings_changed(&self) {
        self.settings_changed.notify_one();
    }

    /// Run one pass over the configured slots now
    pub async fn update_all(&self) -> ReconcileReport {
        let start = Instant::now();
        let report = self.reconciler.reconcile(&self.overlay_ids).await;
        trace!("Reconciliation pass took {:?}", start.elapsed());
        report
    }

    /// Start the update loop
    ///
    /// Reconciles once eagerly, then runs indefinitely,
    /// reconciling every `base_interval` and on every settings change.
    pub async fn run(&self, base_interval: Duration) {
        self.reconciler.start(&self.overlay_ids).await;

        let mut interval = tokio::time::interval(base_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the eager pass already ran
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.settings_changed.notified() => {
                    trace!("Settings changed, reconciling early");
                    interval.reset();
                }
            }
            self.update_all().await;
        }
    }
}
