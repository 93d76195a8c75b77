//! Device registry capability and subscription handles

use crate::error::Result;
use async_trait::async_trait;
use sensor_overlay_types::{Capability, EventKind};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the payload of each delivered event
pub type EventCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// A live event subscription returned by [`Device::subscribe`]
pub trait Subscription: Send + Sync {
    /// Stop delivering events
    fn release(&mut self);
}

/// A device known to the hosting platform
#[async_trait]
pub trait Device: Send + Sync {
    /// Stable device id
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str {
        self.id()
    }

    /// Capabilities the device currently exposes
    fn capabilities(&self) -> HashSet<Capability>;

    /// Unit of this device's temperature readings (e.g. "°C"), if reported
    fn temperature_unit(&self) -> Option<String> {
        None
    }

    /// Subscribe to events of `kind`
    async fn subscribe(&self, kind: EventKind, callback: EventCallback)
        -> Result<Box<dyn Subscription>>;

    /// Current value for `kind`, `None` when the device has no reading yet
    async fn current_value(&self, kind: EventKind) -> Result<Option<Value>>;
}

/// Lookup of devices by id
pub trait DeviceRegistry: Send + Sync {
    fn resolve(&self, device_id: &str) -> Option<Arc<dyn Device>>;
}

/// Owned wrapper around a [`Subscription`].
///
/// Release is idempotent, and dropping an unreleased handle releases it, so a
/// subscription can never outlive the binding that owns it.
pub struct SubscriptionHandle {
    inner: Option<Box<dyn Subscription>>,
    token: u64,
    device_id: String,
    kind: EventKind,
}

impl SubscriptionHandle {
    pub fn new(inner: Box<dyn Subscription>, token: u64, device_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            inner: Some(inner),
            token,
            device_id: device_id.into(),
            kind,
        }
    }

    /// Generation token callbacks of this subscription are tagged with
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Release the subscription; further calls are no-ops
    pub fn release(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            log::debug!(
                "Releasing {:?} subscription on {} (token {})",
                self.kind,
                self.device_id,
                self.token
            );
            inner.release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("token", &self.token)
            .field("device_id", &self.device_id)
            .field("kind", &self.kind)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl Subscription for Counting {
        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut handle = SubscriptionHandle::new(
            Box::new(Counting(releases.clone())),
            1,
            "thermo",
            EventKind::Temperature,
        );
        handle.release();
        handle.release();
        assert!(handle.is_released());
        drop(handle);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let _handle = SubscriptionHandle::new(
                Box::new(Counting(releases.clone())),
                7,
                "thermo",
                EventKind::Humidity,
            );
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_is_send_and_sync() {
        fn shareable<T: Send + Sync>() {}
        shareable::<SubscriptionHandle>();
    }
}
