//! Payload encryption for the soundbar control channel
//!
//! Every JSON payload is encrypted with AES-256-CBC. The key and IV are
//! constants of the device firmware and are never negotiated.

#![allow(missing_docs)]

mod aes;
mod error;

pub use self::aes::{CryptoEngine, pad, unpad};
pub use self::error::CryptoError;

/// Fixed AES-256 key shared by every device speaking this protocol
pub const DEVICE_KEY: &[u8; lengths::AES_256_KEY] = b"T^&*J%^7tr~4^%^&I(o%^!jIJ__+a0 k";

/// Fixed CBC initialization vector
pub const DEVICE_IV: &[u8; lengths::AES_BLOCK] = b"'%^Ur7gy$~t+f)%@";

/// Length of various cryptographic values
pub mod lengths {
    /// AES-256 key length
    pub const AES_256_KEY: usize = 32;
    /// AES block (and CBC IV) length
    pub const AES_BLOCK: usize = 16;
}
