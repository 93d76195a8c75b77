//! Application and overlay configuration

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::DeviceConfig;
use sensor_overlay_core::DEFAULT_UPDATE_INTERVAL_MS;
use sensor_overlay_types::OverlayId;

fn default_version() -> u32 {
    1
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_camera_id() -> String {
    "camera".to_string()
}

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Reconciliation cadence in milliseconds
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,
    /// Id of the camera hosting the overlays (source of face detections)
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    /// Overlay slots, in display order
    #[serde(default)]
    pub overlay_ids: Vec<OverlayId>,
    /// Flat `overlay:{id}:{field}` settings
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    /// Simulated sensor devices
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github.sensor_overlay", "sensor-overlay")
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            update_interval_ms: default_update_interval(),
            camera_id: default_camera_id(),
            overlay_ids: Vec::new(),
            settings: BTreeMap::new(),
            devices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"overlay_ids": ["top", "bottom"]}"#).unwrap();
        assert_eq!(config.update_interval_ms, DEFAULT_UPDATE_INTERVAL_MS);
        assert_eq!(config.camera_id, "camera");
        assert_eq!(config.overlay_ids.len(), 2);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_invalid_overlay_id_rejected() {
        let result = serde_json::from_str::<AppConfig>(r#"{"overlay_ids": ["a:b"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_path() {
        let path = std::env::temp_dir()
            .join(format!("sensor-overlay-test-{}", std::process::id()))
            .join("config.json");
        let mut config = AppConfig::default();
        config.overlay_ids.push(OverlayId::new("top").unwrap());
        config
            .settings
            .insert("overlay:top:text".to_string(), "Hello".to_string());

        config.save_to_path(&path).unwrap();
        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.overlay_ids, config.overlay_ids);
        assert_eq!(loaded.settings, config.settings);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
