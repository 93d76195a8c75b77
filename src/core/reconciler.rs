//! Listener reconciler - keeps one live subscription per overlay slot
//!
//! Each pass resolves every slot from the current settings, computes the
//! binding it should have, and subscribes or releases only where that differs
//! from the binding it already has. Bindings live in a per-instance map; each
//! slot has its own async mutex so overlapping passes (a timer tick racing a
//! settings change) cannot both subscribe for the same slot.
//!
//! Subscription callbacks are tagged with a generation token and funnelled
//! through a channel; an event whose token no longer matches the slot's live
//! binding is dropped.

use super::binding::{
    needs_change, resolve_binding, ActiveBinding, BindingSnapshot, ReconcileReport, SlotOutcome,
};
use crate::overlay::resolve_slot;
use futures::future::join_all;
use log::{debug, info, trace, warn};
use sensor_overlay_core::{
    Device, DeviceRegistry, EventCallback, EventKind, ListenerKind, OverlayId, OverlayKind,
    OverlayUpdate, Result, SettingsStore, SubscriptionHandle, UpdateSink,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// What the reconciler holds for one slot
#[derive(Default)]
struct SlotState {
    binding: Option<ActiveBinding>,
    /// Static text last pushed while the slot had no binding
    shown_text: Option<String>,
}

/// Per-slot cell; the async mutex serialises work on one slot
type SlotCell = Arc<tokio::sync::Mutex<SlotState>>;

/// An event delivered by a subscription, tagged with its origin
#[derive(Debug, Clone)]
pub struct ListenerEvent {
    pub overlay_id: OverlayId,
    pub token: u64,
    pub kind: ListenerKind,
    pub device_id: String,
    pub payload: Value,
}

/// Owns the listener bindings for one camera's overlay set
pub struct ListenerReconciler {
    camera: Arc<dyn Device>,
    registry: Arc<dyn DeviceRegistry>,
    settings: Arc<dyn SettingsStore>,
    sink: Arc<dyn UpdateSink>,
    slots: Mutex<HashMap<OverlayId, SlotCell>>,
    next_token: AtomicU64,
    events_tx: mpsc::UnboundedSender<ListenerEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ListenerEvent>>,
}

impl ListenerReconciler {
    pub fn new(
        camera: Arc<dyn Device>,
        registry: Arc<dyn DeviceRegistry>,
        settings: Arc<dyn SettingsStore>,
        sink: Arc<dyn UpdateSink>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            camera,
            registry,
            settings,
            sink,
            slots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<OverlayId, SlotCell>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("Reconciler slot map was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn slot_cell(&self, overlay_id: &OverlayId) -> SlotCell {
        Arc::clone(self.slots().entry(overlay_id.clone()).or_default())
    }

    /// Eager first pass on startup; static-text slots get their text pushed
    pub async fn start(&self, overlay_ids: &[OverlayId]) -> ReconcileReport {
        let report = self.reconcile(overlay_ids).await;
        info!(
            "Initial reconciliation: {} listener(s) subscribed, {} failed",
            report.subscribed,
            report.failed.len()
        );
        report
    }

    /// Run one reconciliation pass over `overlay_ids`.
    ///
    /// Slots are reconciled independently; a failure in one is logged and
    /// counted without affecting the others. Bindings of slots no longer in
    /// `overlay_ids` are released.
    pub async fn reconcile(&self, overlay_ids: &[OverlayId]) -> ReconcileReport {
        let results = join_all(
            overlay_ids
                .iter()
                .map(|overlay_id| async move { (overlay_id, self.reconcile_slot(overlay_id).await) }),
        )
        .await;

        let mut report = ReconcileReport::default();
        for (overlay_id, result) in results {
            match result {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!("Overlay {}: reconciliation failed: {}", overlay_id, e);
                    report.failed.push((overlay_id.clone(), e.to_string()));
                }
            }
        }

        let configured: HashSet<&OverlayId> = overlay_ids.iter().collect();
        let removed: Vec<(OverlayId, SlotCell)> = self
            .slots()
            .iter()
            .filter(|(overlay_id, _)| !configured.contains(overlay_id))
            .map(|(overlay_id, cell)| (overlay_id.clone(), Arc::clone(cell)))
            .collect();
        for (overlay_id, cell) in removed {
            let mut state = cell.lock().await;
            if let Some(mut binding) = state.binding.take() {
                info!("Overlay {} removed, releasing its {} listener", overlay_id, binding.kind);
                binding.handle.release();
                report.released += 1;
            }
            drop(state);
            self.slots().remove(&overlay_id);
        }

        if report.is_quiet() {
            trace!("Reconciliation pass: nothing to do ({} slots)", overlay_ids.len());
        } else {
            debug!(
                "Reconciliation pass: {} subscribed, {} released, {} unchanged, {} failed",
                report.subscribed,
                report.released,
                report.unchanged,
                report.failed.len()
            );
        }
        report
    }

    /// Converge a single slot to its desired binding
    pub async fn reconcile_slot(&self, overlay_id: &OverlayId) -> Result<SlotOutcome> {
        let slot = resolve_slot(self.settings.as_ref(), overlay_id);
        let desired = resolve_binding(&slot, self.registry.as_ref(), &self.camera);

        let cell = self.slot_cell(overlay_id);
        let mut state = cell.lock().await;

        let current_key = state
            .binding
            .as_ref()
            .map(|binding| (binding.kind, binding.device_id()));
        let mut outcome = SlotOutcome::Unchanged;

        if needs_change(current_key, &desired, slot.kind) {
            if let (Some(device), Some(event_kind)) = (desired.device.clone(), desired.kind.event_kind()) {
                // Never two live subscriptions for one slot: release before replacing
                let replaced = match state.binding.take() {
                    Some(mut old) => {
                        info!(
                            "Overlay {}: replacing {} listener on {}",
                            overlay_id,
                            old.kind,
                            old.device_id()
                        );
                        old.handle.release();
                        true
                    }
                    None => false,
                };
                state.shown_text = None;

                let device_id = desired.device_id.unwrap_or_else(|| device.id().to_string());
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                let callback = self.event_callback(overlay_id.clone(), token, desired.kind, device_id.clone());
                let subscription = device.subscribe(event_kind, callback).await?;

                info!(
                    "Overlay {}: subscribed to {} events on {} (token {})",
                    overlay_id, desired.kind, device_id, token
                );
                let binding = ActiveBinding {
                    kind: desired.kind,
                    device: Arc::clone(&device),
                    handle: SubscriptionHandle::new(subscription, token, device_id.clone(), event_kind),
                };
                let unit = binding.unit();
                state.binding = Some(binding);

                if matches!(desired.kind, ListenerKind::Temperature | ListenerKind::Humidity) {
                    self.push_current_value(overlay_id, device, event_kind, desired.kind, device_id, unit)
                        .await;
                }
                return Ok(SlotOutcome::Subscribed { replaced });
            }

            if let Some(mut binding) = state.binding.take() {
                info!(
                    "Overlay {}: releasing {} listener on {}",
                    overlay_id,
                    binding.kind,
                    binding.device_id()
                );
                binding.handle.release();
                state.shown_text = None;
                outcome = SlotOutcome::Released;
            }
        }

        // Pushed whenever it differs from what this slot last showed, so text
        // edits and reverts from an unbound sensor slot reach the overlay
        if slot.kind == OverlayKind::StaticText
            && state.binding.is_none()
            && state.shown_text.as_deref() != Some(slot.static_text.as_str())
        {
            let update = OverlayUpdate::static_text(overlay_id.clone(), slot.static_text.clone());
            self.sink.on_update(update).await?;
            state.shown_text = Some(slot.static_text);
        }

        Ok(outcome)
    }

    /// Push the device's current reading so the overlay is not blank until
    /// the next event arrives
    async fn push_current_value(
        &self,
        overlay_id: &OverlayId,
        device: Arc<dyn Device>,
        event_kind: EventKind,
        kind: ListenerKind,
        device_id: String,
        unit: Option<String>,
    ) {
        let raw_data = match device.current_value(event_kind).await {
            Ok(value) => value.unwrap_or(Value::Null),
            Err(e) => {
                warn!("Overlay {}: {}", overlay_id, e);
                return;
            }
        };

        let update = OverlayUpdate {
            overlay_id: overlay_id.clone(),
            listener_kind: kind,
            raw_data,
            source_device: Some(device_id),
            unit,
            suppress_log: false,
        };
        if let Err(e) = self.sink.on_update(update).await {
            warn!("Overlay {}: failed to push current value: {}", overlay_id, e);
        }
    }

    fn event_callback(
        &self,
        overlay_id: OverlayId,
        token: u64,
        kind: ListenerKind,
        device_id: String,
    ) -> EventCallback {
        let events = self.events_tx.clone();
        Arc::new(move |payload: Value| {
            let event = ListenerEvent {
                overlay_id: overlay_id.clone(),
                token,
                kind,
                device_id: device_id.clone(),
                payload,
            };
            if events.send(event).is_err() {
                trace!("Event channel closed, dropping event for overlay {}", overlay_id);
            }
        })
    }

    /// Forward one subscription event to the sink, unless its subscription
    /// has since been released or replaced
    pub async fn handle_event(&self, event: ListenerEvent) -> Result<()> {
        let Some(cell) = self.slots().get(&event.overlay_id).cloned() else {
            trace!("Dropping event for unknown overlay {}", event.overlay_id);
            return Ok(());
        };

        let state = cell.lock().await;
        let Some(binding) = state
            .binding
            .as_ref()
            .filter(|b| b.handle.token() == event.token)
        else {
            trace!(
                "Dropping stale {} event for overlay {} (token {})",
                event.kind,
                event.overlay_id,
                event.token
            );
            return Ok(());
        };

        let update = OverlayUpdate {
            overlay_id: event.overlay_id,
            listener_kind: event.kind,
            raw_data: event.payload,
            source_device: Some(event.device_id),
            unit: binding.unit(),
            suppress_log: false,
        };
        self.sink.on_update(update).await
    }

    /// Process the events already queued, without waiting for more.
    ///
    /// Returns how many events were taken off the queue.
    pub async fn drain_events(&self) -> usize {
        let mut events = self.events_rx.lock().await;
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            handled += 1;
            if let Err(e) = self.handle_event(event).await {
                warn!("Failed to push event update: {}", e);
            }
        }
        handled
    }

    /// Pump subscription events to the sink until the reconciler is dropped.
    ///
    /// Holds the event queue for its whole lifetime; do not combine with
    /// [`drain_events`](Self::drain_events).
    pub async fn run_events(self: Arc<Self>) {
        let mut events = self.events_rx.lock().await;
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                warn!("Failed to push event update: {}", e);
            }
        }
        debug!("Event pump stopped");
    }

    /// Snapshot of every live binding, sorted by overlay id
    pub async fn bindings(&self) -> Vec<BindingSnapshot> {
        let cells: Vec<(OverlayId, SlotCell)> = self
            .slots()
            .iter()
            .map(|(overlay_id, cell)| (overlay_id.clone(), Arc::clone(cell)))
            .collect();

        let mut snapshots = Vec::new();
        for (overlay_id, cell) in cells {
            if let Some(binding) = cell.lock().await.binding.as_ref() {
                snapshots.push(BindingSnapshot {
                    overlay_id,
                    kind: binding.kind,
                    device_id: binding.device_id().to_string(),
                    token: binding.handle.token(),
                });
            }
        }
        snapshots.sort_by(|a, b| a.overlay_id.cmp(&b.overlay_id));
        snapshots
    }

    /// Release every live subscription
    pub async fn shutdown(&self) -> usize {
        let cells: Vec<SlotCell> = self.slots().drain().map(|(_, cell)| cell).collect();
        let mut released = 0;
        for cell in cells {
            if let Some(mut binding) = cell.lock().await.binding.take() {
                binding.handle.release();
                released += 1;
            }
        }
        info!("Released {} listener(s) on shutdown", released);
        released
    }
}
