//! Frame codec for the encrypted control channel
//!
//! Wire format:
//!
//! ```text
//! +------+-----------------+---------------------------+
//! | 0x10 | length (u32 BE) | AES-256-CBC ciphertext    |
//! +------+-----------------+---------------------------+
//!   1 B        4 B            length bytes, length % 16 == 0
//! ```
//!
//! The codec encrypts on encode and decrypts on decode, so both directions
//! deal in plaintext JSON bytes.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::ProtocolError;
use super::crypto::{CryptoEngine, lengths};

/// Tag byte marking an encrypted payload frame
pub const FRAME_TAG: u8 = 0x10;

/// Tag byte plus length prefix
pub const HEADER_LEN: usize = 5;

/// Largest payload the decoder will buffer (1MB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Encrypting frame codec
///
/// Decoding never fails on bad input: invalid frames are yielded as
/// `Err(ProtocolError)` items so a `FramedRead` keeps running after them.
/// Only I/O errors end the stream.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    engine: CryptoEngine,
    max_frame_len: usize,
    discarded: u64,
}

impl FrameCodec {
    /// Create a codec using the device's built-in key
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(CryptoEngine::device())
    }

    /// Create a codec with a specific cipher
    #[must_use]
    pub fn with_engine(engine: CryptoEngine) -> Self {
        Self {
            engine,
            max_frame_len: MAX_FRAME_LEN,
            discarded: 0,
        }
    }

    /// Set maximum accepted payload length
    #[must_use]
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Total bytes skipped while searching for a frame tag
    #[must_use]
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Encode a plaintext payload into a complete frame
    #[must_use]
    pub fn encode_frame(&self, plaintext: &[u8]) -> Bytes {
        let mut dst = BytesMut::new();
        self.write_frame(plaintext, &mut dst);
        dst.freeze()
    }

    fn write_frame(&self, plaintext: &[u8], dst: &mut BytesMut) {
        let ciphertext = self.engine.encrypt(plaintext);
        dst.reserve(HEADER_LEN + ciphertext.len());
        dst.put_u8(FRAME_TAG);
        // Payloads are JSON commands, far below 4GB
        #[allow(clippy::cast_possible_truncation)]
        dst.put_u32(ciphertext.len() as u32);
        dst.extend_from_slice(&ciphertext);
    }

    /// Drop bytes up to the next tag byte
    fn resync(&mut self, src: &mut BytesMut) {
        let skip = src
            .iter()
            .position(|&b| b == FRAME_TAG)
            .unwrap_or(src.len());
        if skip > 0 {
            tracing::trace!("Discarding {} bytes before frame tag", skip);
            self.discarded += skip as u64;
            src.advance(skip);
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write_frame(&item, dst);
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Result<Bytes, ProtocolError>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.resync(src);

        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;

        if length > self.max_frame_len {
            // Cannot buffer it; treat the tag as noise and resync past it
            src.advance(1);
            self.discarded += 1;
            return Ok(Some(Err(ProtocolError::FrameTooLarge {
                length,
                max: self.max_frame_len,
            })));
        }

        if src.len() < HEADER_LEN + length {
            src.reserve(HEADER_LEN + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let ciphertext = src.split_to(length);

        if length % lengths::AES_BLOCK != 0 {
            return Ok(Some(Err(ProtocolError::MisalignedFrame { length })));
        }

        tracing::trace!("Decoded frame with {} byte payload", length);

        Ok(Some(
            self.engine
                .decrypt(&ciphertext)
                .map(Bytes::from)
                .map_err(ProtocolError::from),
        ))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if !buf.is_empty() {
            tracing::debug!("Discarding {} bytes of partial frame at EOF", buf.len());
            buf.clear();
        }
        Ok(None)
    }
}
