//! Testing utilities

pub mod mock_device;
#[cfg(test)]
/// Unit tests for the mock device.
mod tests;

pub use mock_device::{MockSoundbar, MockSoundbarConfig};

use std::net::SocketAddr;

use crate::types::SoundbarConfig;

/// Helper to build a client config pointing at a mock device.
///
/// Uses short timeouts so failing tests fail fast.
#[must_use]
pub fn config_for(addr: SocketAddr) -> SoundbarConfig {
    SoundbarConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .connection_timeout(std::time::Duration::from_secs(2))
        .write_timeout(std::time::Duration::from_secs(2))
        .build()
}
