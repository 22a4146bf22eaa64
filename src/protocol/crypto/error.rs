use thiserror::Error;

/// Cryptographic operation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid ciphertext length {0}: must be a positive multiple of 16")]
    InvalidLength(usize),

    #[error("invalid padding byte {pad} for {len}-byte plaintext")]
    InvalidPadding { pad: u8, len: usize },
}
