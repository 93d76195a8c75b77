//! Listener kinds and device capabilities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability a device may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "thermometer")]
    Thermometer,
    #[serde(rename = "humidity_sensor")]
    HumiditySensor,
    #[serde(rename = "object_detector")]
    ObjectDetector,
}

/// Kind of event a subscription delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "object_detection")]
    ObjectDetection,
}

impl EventKind {
    /// Capability a device needs to deliver this kind of event
    pub fn capability(self) -> Capability {
        match self {
            EventKind::Temperature => Capability::Thermometer,
            EventKind::Humidity => Capability::HumiditySensor,
            EventKind::ObjectDetection => Capability::ObjectDetector,
        }
    }
}

/// Category of live event source feeding an overlay slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ListenerKind {
    Temperature,
    Humidity,
    Face,
    #[default]
    None,
}

impl ListenerKind {
    /// Event kind to subscribe to, `None` for slots that need no subscription
    pub fn event_kind(self) -> Option<EventKind> {
        match self {
            ListenerKind::Temperature => Some(EventKind::Temperature),
            ListenerKind::Humidity => Some(EventKind::Humidity),
            ListenerKind::Face => Some(EventKind::ObjectDetection),
            ListenerKind::None => None,
        }
    }

    /// Listener kind for a bound sensor device.
    ///
    /// Temperature always wins over humidity when a device exposes both.
    pub fn for_capabilities<'a>(capabilities: impl IntoIterator<Item = &'a Capability>) -> Self {
        let mut humidity = false;
        for capability in capabilities {
            match capability {
                Capability::Thermometer => return ListenerKind::Temperature,
                Capability::HumiditySensor => humidity = true,
                Capability::ObjectDetector => {}
            }
        }
        if humidity {
            ListenerKind::Humidity
        } else {
            ListenerKind::None
        }
    }

    pub fn is_none(self) -> bool {
        self == ListenerKind::None
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListenerKind::Temperature => "temperature",
            ListenerKind::Humidity => "humidity",
            ListenerKind::Face => "face",
            ListenerKind::None => "none",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_precedence() {
        let caps = [Capability::HumiditySensor, Capability::Thermometer];
        assert_eq!(ListenerKind::for_capabilities(&caps), ListenerKind::Temperature);
    }

    #[test]
    fn test_humidity_and_none() {
        assert_eq!(
            ListenerKind::for_capabilities(&[Capability::HumiditySensor]),
            ListenerKind::Humidity
        );
        assert_eq!(
            ListenerKind::for_capabilities(&[Capability::ObjectDetector]),
            ListenerKind::None
        );
        assert_eq!(ListenerKind::for_capabilities(&[]), ListenerKind::None);
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(ListenerKind::Face.event_kind(), Some(EventKind::ObjectDetection));
        assert_eq!(ListenerKind::None.event_kind(), None);
    }
}
