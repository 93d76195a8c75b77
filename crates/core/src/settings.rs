//! Settings store capability

use crate::error::Result;
use sensor_overlay_types::SettingKey;

/// Flat key/value settings storage.
///
/// No transactional semantics: each read sees whatever was last written.
pub trait SettingsStore: Send + Sync {
    /// Stored value for `key`, `None` when unset
    fn get(&self, key: &SettingKey) -> Option<String>;

    /// Store `value` under `key`; `None` removes it
    fn put(&self, key: &SettingKey, value: Option<String>) -> Result<()>;
}
