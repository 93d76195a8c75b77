//! Settings field metadata for describing the editable overlay settings

use crate::key::SettingKey;
use crate::listener::Capability;
use serde::{Deserialize, Serialize};

/// Type of input a settings field needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingFieldType {
    /// Free text (e.g., static text, template)
    Text,
    /// Non-negative integer
    Number,
    /// One of a fixed set of choices
    Choice(Vec<String>),
    /// Device picker, limited to devices exposing one of these capabilities
    Device(Vec<Capability>),
}

/// Metadata describing a single editable setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingField {
    /// Settings key this field edits
    #[serde(with = "storage_key")]
    pub key: SettingKey,
    /// Group heading (one per overlay slot)
    pub group: String,
    /// Human-readable name
    pub title: String,
    /// Description of what this field controls
    pub description: String,
    /// Input type
    pub field_type: SettingFieldType,
    /// Currently stored value, if any
    pub value: Option<String>,
}

impl SettingField {
    /// Create a new settings field
    pub fn new(
        key: SettingKey,
        title: impl Into<String>,
        description: impl Into<String>,
        field_type: SettingFieldType,
        value: Option<String>,
    ) -> Self {
        Self {
            group: format!("Overlay {}", key.overlay_id),
            key,
            title: title.into(),
            description: description.into(),
            field_type,
            value,
        }
    }
}

mod storage_key {
    use crate::key::SettingKey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &SettingKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.storage_key())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SettingKey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SettingKey::parse(&raw).map_err(D::Error::custom)
    }
}
