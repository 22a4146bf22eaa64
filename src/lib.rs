//! # soundbar
//!
//! An async Rust client for the encrypted control protocol spoken by
//! networked soundbars over a persistent TCP socket.
//!
//! ## Features
//!
//! - AES-CBC framed wire protocol (encode, decode, resynchronization)
//! - Background listener that keeps a local cache of device state
//! - Rate-limited automatic reconnection
//! - Volume, mute, equalizer, input function and settings control
//!
//! ## Example
//!
//! ```rust,no_run
//! use soundbar::{SoundbarClient, SoundbarConfig};
//!
//! # async fn example() -> Result<(), soundbar::SoundbarError> {
//! let config = SoundbarConfig::builder().host("192.168.1.113").build();
//! let client = SoundbarClient::connect(config).await?;
//!
//! client.set_volume(20).await?;
//! let status = client.get_full_status().await?;
//! println!("volume: {:?}, input: {:?}", status.volume, status.func);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **High-level**: `SoundbarClient` - get/set operations over a cached state
//! - **Mid-level**: `ConnectionManager` - socket ownership, retry gate, listener
//! - **Low-level**: `protocol` - frame codec, cipher and message types
//!
//! # Security
//!
//! The device protocol encrypts every payload with AES-256-CBC under a key and
//! IV that are hardcoded in the firmware and identical on every unit. A
//! compatible client must reproduce them, so this crate does too. The
//! encryption offers no confidentiality against anyone who knows the protocol.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// State management
pub mod state;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

mod client;
pub mod connection;
pub mod control;
pub mod net;
pub mod protocol;

// Re-exports
pub use client::SoundbarClient;
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use control::{Equalizer, InputFunction, Volume};
pub use error::SoundbarError;
pub use protocol::{Command, Message, MessageTag};
pub use state::{DeviceEvent, DeviceState, DeviceStateStore};
pub use types::SoundbarConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        DeviceState, Equalizer, InputFunction, SoundbarClient, SoundbarConfig, SoundbarError,
        Volume,
    };
}
