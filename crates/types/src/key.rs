//! Typed settings keys.
//!
//! Overlay settings live in a flat string-keyed store under
//! `overlay:{overlay_id}:{field}`. Building keys through [`SettingKey`]
//! instead of string concatenation means a typo in a field name is a
//! compile error and a malformed overlay id is rejected up front.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace prefix shared by every overlay setting key
pub const KEY_NAMESPACE: &str = "overlay";

/// Separator between the key segments
const KEY_SEPARATOR: char = ':';

/// Errors raised while building or parsing settings keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("overlay id must not be empty")]
    EmptyOverlayId,
    #[error("overlay id {0:?} must not contain ':'")]
    SeparatorInOverlayId(String),
    #[error("unknown overlay field {0:?}")]
    UnknownField(String),
    #[error("malformed settings key {0:?}")]
    MalformedKey(String),
}

/// Stable identifier of one overlay slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OverlayId(String);

impl OverlayId {
    pub fn new(id: impl Into<String>) -> Result<Self, KeyError> {
        let id = id.into();
        if id.is_empty() {
            return Err(KeyError::EmptyOverlayId);
        }
        if id.contains(KEY_SEPARATOR) {
            return Err(KeyError::SeparatorInOverlayId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key for one of this slot's settings
    pub fn key(&self, field: OverlayField) -> SettingKey {
        SettingKey::new(self.clone(), field)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OverlayId {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OverlayId> for String {
    fn from(id: OverlayId) -> Self {
        id.0
    }
}

/// The five per-slot settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlayField {
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "device")]
    Device,
    #[serde(rename = "regex")]
    Template,
    #[serde(rename = "maxDecimals")]
    MaxDecimals,
}

impl OverlayField {
    pub const ALL: [OverlayField; 5] = [
        OverlayField::Type,
        OverlayField::Text,
        OverlayField::Device,
        OverlayField::Template,
        OverlayField::MaxDecimals,
    ];

    /// Name of the field as it appears in the storage key
    pub fn storage_name(self) -> &'static str {
        match self {
            OverlayField::Type => "type",
            OverlayField::Text => "text",
            OverlayField::Device => "device",
            OverlayField::Template => "regex",
            OverlayField::MaxDecimals => "maxDecimals",
        }
    }
}

impl FromStr for OverlayField {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.storage_name() == s)
            .ok_or_else(|| KeyError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for OverlayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

/// A validated `(overlay id, field)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingKey {
    pub overlay_id: OverlayId,
    pub field: OverlayField,
}

impl SettingKey {
    pub fn new(overlay_id: OverlayId, field: OverlayField) -> Self {
        Self { overlay_id, field }
    }

    /// Flat storage key, e.g. `overlay:front:regex`
    pub fn storage_key(&self) -> String {
        format!(
            "{KEY_NAMESPACE}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.overlay_id, self.field
        )
    }

    /// Parse a flat storage key back into its typed form
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let mut parts = raw.splitn(3, KEY_SEPARATOR);
        let (Some(KEY_NAMESPACE), Some(id), Some(field)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(KeyError::MalformedKey(raw.to_string()));
        };
        Ok(Self::new(OverlayId::new(id)?, field.parse()?))
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let id = OverlayId::new("front").unwrap();
        assert_eq!(id.key(OverlayField::Template).storage_key(), "overlay:front:regex");
        assert_eq!(id.key(OverlayField::MaxDecimals).storage_key(), "overlay:front:maxDecimals");
    }

    #[test]
    fn test_overlay_id_validation() {
        assert_eq!(OverlayId::new(""), Err(KeyError::EmptyOverlayId));
        assert!(matches!(
            OverlayId::new("a:b"),
            Err(KeyError::SeparatorInOverlayId(_))
        ));
    }

    #[test]
    fn test_parse_key() {
        let key = SettingKey::parse("overlay:slot1:device").unwrap();
        assert_eq!(key.overlay_id.as_str(), "slot1");
        assert_eq!(key.field, OverlayField::Device);

        assert!(matches!(
            SettingKey::parse("overlay:slot1:colour"),
            Err(KeyError::UnknownField(_))
        ));
        assert!(matches!(
            SettingKey::parse("settings:slot1:type"),
            Err(KeyError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_overlay_id_deserialize_rejects_separator() {
        let ok: OverlayId = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(ok.as_str(), "left");
        assert!(serde_json::from_str::<OverlayId>("\"le:ft\"").is_err());
    }
}
