use thiserror::Error;

use super::crypto::CryptoError;

/// Errors raised while decoding inbound traffic
///
/// None of these are fatal to a connection: the offending frame or message
/// is dropped and decoding continues with the next one.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload length is not a multiple of the cipher block size
    #[error("misaligned frame: payload length {length} is not a multiple of 16")]
    MisalignedFrame {
        /// Declared payload length
        length: usize,
    },

    /// Declared payload length exceeds the decoder limit
    #[error("frame too large: {length} bytes (max {max})")]
    FrameTooLarge {
        /// Declared payload length
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// Payload could not be decrypted
    #[error("decryption failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Decrypted payload is not UTF-8
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Decrypted payload is not a valid message object
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A known field carried a value of the wrong type
    #[error("invalid field {field} in {tag}: expected {expected}")]
    InvalidField {
        /// Message tag the field belongs to
        tag: String,
        /// Wire name of the field
        field: &'static str,
        /// Description of the expected type
        expected: &'static str,
    },
}
