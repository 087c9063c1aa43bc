//! switchyard-core: shared types, configuration, and collaborator
//! interfaces for the switchyard deployment engine.

pub mod config;
pub mod diff;
pub mod hash;
pub mod provider;
pub mod redact;
pub mod types;

pub use config::{ConfigError, ProjectConfig};
pub use provider::{ProviderError, ProviderResult};
pub use types::*;

/// Current Unix time in seconds.
pub fn epoch_secs() -> u64 {
    epoch_millis() / 1000
}

/// Current Unix time in milliseconds.
pub fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
