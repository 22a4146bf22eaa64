//! Wire protocol for the soundbar control channel
//!
//! Sans-IO building blocks: the payload cipher, the frame codec and the
//! JSON message model. Socket handling lives in [`crate::connection`].

pub mod crypto;
mod error;
pub mod frame;
pub mod message;


pub use error::ProtocolError;
pub use frame::{FRAME_TAG, FrameCodec, HEADER_LEN, MAX_FRAME_LEN};
pub use message::{Command, Message, MessageTag, fields};

/// Default TCP port of the control channel
pub const DEFAULT_PORT: u16 = 9741;
