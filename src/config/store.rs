//! In-memory settings store

use sensor_overlay_core::{OverlayError, Result, SettingsStore};
use sensor_overlay_types::SettingKey;
use std::collections::HashMap;
use std::sync::RwLock;

/// Settings kept in a map, keyed by flat storage key
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; convenience over [`SettingsStore::put`] for callers
    /// that always set a value
    pub fn set(&self, key: &SettingKey, value: impl Into<String>) {
        let mut values = self.values.write().unwrap_or_else(|poisoned| {
            log::warn!("Settings lock was poisoned, recovering");
            poisoned.into_inner()
        });
        values.insert(key.storage_key(), value.into());
    }

    /// Store a value under a raw `overlay:{id}:{field}` key, rejecting keys
    /// that do not name a known overlay field
    pub fn set_raw(&self, storage_key: &str, value: impl Into<String>) -> Result<()> {
        let key = SettingKey::parse(storage_key)?;
        self.set(&key, value);
        Ok(())
    }

    /// Build from raw pairs, skipping (and logging) invalid keys
    pub fn from_validated<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let settings = Self::new();
        for (key, value) in pairs {
            if let Err(e) = settings.set_raw(key.as_ref(), value) {
                log::warn!("Ignoring setting {:?}: {}", key.as_ref(), e);
            }
        }
        settings
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &SettingKey) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|poisoned| {
            log::warn!("Settings lock was poisoned, recovering");
            poisoned.into_inner()
        });
        values.get(&key.storage_key()).cloned()
    }

    fn put(&self, key: &SettingKey, value: Option<String>) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| OverlayError::Settings(format!("Lock poisoned: {}", e)))?;
        match value {
            Some(value) => values.insert(key.storage_key(), value),
            None => values.remove(&key.storage_key()),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_overlay_types::{OverlayField, OverlayId};

    #[test]
    fn test_put_get_remove() {
        let settings = MemorySettings::new();
        let key = OverlayId::new("a").unwrap().key(OverlayField::Text);

        assert_eq!(settings.get(&key), None);
        settings.put(&key, Some("Hello".to_string())).unwrap();
        assert_eq!(settings.get(&key).as_deref(), Some("Hello"));

        settings.put(&key, None).unwrap();
        assert_eq!(settings.get(&key), None);
    }

    #[test]
    fn test_raw_keys_are_validated() {
        let settings = MemorySettings::new();
        settings.set_raw("overlay:a:maxDecimals", "2").unwrap();
        assert!(matches!(
            settings.set_raw("overlay:a:colour", "red"),
            Err(OverlayError::InvalidKey(_))
        ));
        assert!(settings.set_raw("camera:a:text", "x").is_err());

        let loaded = MemorySettings::from_validated([
            ("overlay:b:text", "Porch"),
            ("overlay::text", "nope"),
        ]);
        let key = OverlayId::new("b").unwrap().key(OverlayField::Text);
        assert_eq!(loaded.get(&key).as_deref(), Some("Porch"));
        let decimals = OverlayId::new("a").unwrap().key(OverlayField::MaxDecimals);
        assert_eq!(settings.get(&decimals).as_deref(), Some("2"));
    }
}
