//! Configuration management

mod settings;
mod store;

pub use settings::AppConfig;
pub use store::MemorySettings;
