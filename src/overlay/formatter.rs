//! Template formatter - turns raw listener data into overlay text
//!
//! Templates recognise two placeholders, `${value}` and `${unit}`. Both are
//! substituted unconditionally; a template missing one simply shows nothing
//! for it.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sensor_overlay_core::{HUMIDITY_UNIT, MAX_FORMAT_DECIMALS};
use sensor_overlay_types::{DetectionResult, ListenerKind, OverlaySlot};
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(value|unit)\}").expect("Invalid regex"));

/// Coerce a raw reading to a finite number; anything unusable becomes 0
pub fn coerce_number(raw: &Value) -> f64 {
    let number = match raw {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Largest magnitude below which an `f64` can still carry a fraction
const MAX_FRACTIONAL: f64 = 9_007_199_254_740_992.0;

/// Round half away from zero at `decimals` fractional digits
fn round_half_up(number: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = number * factor;
    if !scaled.is_finite() || scaled.abs() >= MAX_FRACTIONAL {
        return number;
    }
    scaled.round() / factor
}

/// Format a raw reading with exactly `max_decimals` fractional digits.
///
/// Ties round away from zero (`21.25` -> `21.3`), not to even.
pub fn format_reading(raw: &Value, max_decimals: u32) -> String {
    let decimals = max_decimals.min(MAX_FORMAT_DECIMALS);
    format!("{:.*}", decimals as usize, round_half_up(coerce_number(raw), decimals))
}

/// Substitute `${value}` and `${unit}` in `template`
pub fn apply_template(template: &str, value: &str, unit: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "value" => value.to_string(),
            _ => unit.to_string(),
        })
        .into_owned()
}

/// Templated text for one update, or `None` when the update carries no value
/// (static text, or a detection event without a face).
///
/// `unit` is the source device's temperature unit; humidity always uses `%`.
pub fn render_value(
    kind: ListenerKind,
    raw: &Value,
    slot: &OverlaySlot,
    unit: Option<&str>,
) -> Option<String> {
    let (value, unit) = match kind {
        ListenerKind::Face => (
            DetectionResult::from_value(raw).face_label().map(str::to_string),
            None,
        ),
        ListenerKind::Temperature => (Some(format_reading(raw, slot.max_decimals)), unit),
        ListenerKind::Humidity => (
            Some(format_reading(raw, slot.max_decimals)),
            Some(HUMIDITY_UNIT),
        ),
        ListenerKind::None => (None, None),
    };

    value.map(|value| apply_template(&slot.template, &value, unit.unwrap_or_default()))
}

/// Display text for one update; the slot's static text when
/// [`render_value`] produces nothing
pub fn format_text(kind: ListenerKind, raw: &Value, slot: &OverlaySlot, unit: Option<&str>) -> String {
    render_value(kind, raw, slot, unit).unwrap_or_else(|| slot.static_text.clone())
}
