//! Shared constants

/// Device id recorded for face-detection bindings, which are fed by the
/// hosting camera itself rather than a bound device
pub const SELF_DEVICE_ID: &str = "self";

/// Default reconciliation cadence in milliseconds
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5000;

/// Unit shown for humidity readings
pub const HUMIDITY_UNIT: &str = "%";

/// Upper bound on fractional digits when formatting readings
pub const MAX_FORMAT_DECIMALS: u32 = 20;
