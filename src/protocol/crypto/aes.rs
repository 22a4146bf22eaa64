use super::{CryptoError, DEVICE_IV, DEVICE_KEY, lengths};
use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

const BLOCK: usize = lengths::AES_BLOCK;

/// AES-256-CBC cipher with a fixed IV
///
/// The cipher holds no chaining state between calls: every payload is
/// encrypted from the same IV, as the device expects.
#[derive(Clone)]
pub struct CryptoEngine {
    cipher: Aes256,
    iv: [u8; BLOCK],
}

impl CryptoEngine {
    /// Create cipher with 32-byte key and 16-byte IV
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != lengths::AES_256_KEY {
            return Err(CryptoError::InvalidKeyLength {
                expected: lengths::AES_256_KEY,
                actual: key.len(),
            });
        }
        let iv: [u8; BLOCK] = iv.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: BLOCK,
            actual: iv.len(),
        })?;

        let cipher = Aes256::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: lengths::AES_256_KEY,
            actual: key.len(),
        })?;

        Ok(Self { cipher, iv })
    }

    /// Cipher configured with the device's built-in key and IV
    #[must_use]
    pub fn device() -> Self {
        Self {
            cipher: Aes256::new(GenericArray::from_slice(DEVICE_KEY)),
            iv: *DEVICE_IV,
        }
    }

    /// Pad and encrypt. The output is always a non-empty multiple of 16 bytes.
    #[must_use]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut data = pad(plaintext);
        let mut prev = self.iv;

        for chunk in data.chunks_exact_mut(BLOCK) {
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            self.cipher.encrypt_block(aes::Block::from_mut_slice(chunk));
            prev.copy_from_slice(chunk);
        }

        data
    }

    /// Decrypt and strip padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK != 0 {
            return Err(CryptoError::InvalidLength(ciphertext.len()));
        }

        let mut data = ciphertext.to_vec();
        let mut prev = self.iv;

        for chunk in data.chunks_exact_mut(BLOCK) {
            let mut saved = [0u8; BLOCK];
            saved.copy_from_slice(chunk);

            self.cipher.decrypt_block(aes::Block::from_mut_slice(chunk));
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            prev = saved;
        }

        unpad(&mut data)?;
        Ok(data)
    }
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine").finish_non_exhaustive()
    }
}

/// PKCS#7-style padding to the next 16-byte boundary.
///
/// Always appends between 1 and 16 bytes, each equal to the pad length.
#[must_use]
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK - (data.len() % BLOCK);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    #[allow(clippy::cast_possible_truncation, reason = "pad_len is 1..=16")]
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// Remove padding by reading the final byte as the pad length.
///
/// Only the length byte is checked; the filler bytes are not compared.
pub fn unpad(data: &mut Vec<u8>) -> Result<(), CryptoError> {
    let Some(&pad) = data.last() else {
        return Err(CryptoError::InvalidPadding { pad: 0, len: 0 });
    };
    let pad_len = usize::from(pad);
    if pad_len == 0 || pad_len > BLOCK || pad_len > data.len() {
        return Err(CryptoError::InvalidPadding {
            pad,
            len: data.len(),
        });
    }
    data.truncate(data.len() - pad_len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_adds_full_block_when_aligned() {
        let padded = pad(&[0u8; 16]);
        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == 16));
    }

    #[test]
    fn test_pad_empty() {
        assert_eq!(pad(&[]), vec![16u8; 16]);
    }

    #[test]
    fn test_unpad_rejects_zero() {
        let mut data = vec![1, 2, 3, 0];
        assert!(matches!(
            unpad(&mut data),
            Err(CryptoError::InvalidPadding { pad: 0, .. })
        ));
    }

    #[test]
    fn test_unpad_rejects_oversized() {
        let mut data = vec![0x20; 32];
        assert!(unpad(&mut data).is_err());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let engine = CryptoEngine::device();
        let data = br#"{"cmd":"get","msg":"EQ_VIEW_INFO"}"#;

        let encrypted = engine.encrypt(data);
        assert_eq!(encrypted.len() % 16, 0);
        assert_ne!(&encrypted[..16], &data[..16]);

        let decrypted = engine.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_cbc_chains_blocks() {
        let engine = CryptoEngine::device();
        // Two identical plaintext blocks must not produce identical ciphertext blocks
        let encrypted = engine.encrypt(&[0x41; 32]);
        assert_ne!(encrypted[0..16], encrypted[16..32]);
    }

    #[test]
    fn test_decrypt_rejects_unaligned() {
        let engine = CryptoEngine::device();
        assert_eq!(
            engine.decrypt(&[0u8; 15]).unwrap_err(),
            CryptoError::InvalidLength(15)
        );
        assert_eq!(
            engine.decrypt(&[]).unwrap_err(),
            CryptoError::InvalidLength(0)
        );
    }

    #[test]
    fn test_new_rejects_short_key() {
        let err = CryptoEngine::new(&[0u8; 16], DEVICE_IV).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn test_new_matches_device() {
        let custom = CryptoEngine::new(DEVICE_KEY, DEVICE_IV).unwrap();
        let device = CryptoEngine::device();
        assert_eq!(custom.encrypt(b"abc"), device.encrypt(b"abc"));
    }
}
