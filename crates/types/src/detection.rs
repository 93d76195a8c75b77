//! Object detection event payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification name reported for a detected face
pub const FACE_CLASS: &str = "face";

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetection {
    pub class_name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Payload of an object detection event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub detections: Vec<ObjectDetection>,
}

impl DetectionResult {
    /// Decode an event payload, treating anything unexpected as "no detections"
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// Label of the first detection classified as a face
    pub fn face_label(&self) -> Option<&str> {
        self.detections
            .iter()
            .find(|d| d.class_name == FACE_CLASS)
            .and_then(|d| d.label.as_deref())
    }
}
