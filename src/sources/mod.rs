//! Built-in device sources
//!
//! The hosting platform normally supplies devices. The simulated devices here
//! stand in for it in the demo runner and in tests.

mod simulated;

pub use simulated::{
    DeviceConfig, Oscillation, SimulatedDevice, SimulatedRegistry, SubscriptionEvent,
};
