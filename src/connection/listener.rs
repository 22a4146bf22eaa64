//! Inbound frame listener
//!
//! One listener runs per live connection. It owns the read half of the socket,
//! decodes frames, and merges every message into the shared store. Malformed
//! frames and messages are logged and skipped; only socket-level failures end
//! the loop.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::RwLock;
use tokio_util::codec::FramedRead;

use super::state::{ConnectionStats, DisconnectReason};
use crate::net::Runtime;
use crate::protocol::{FrameCodec, Message, ProtocolError};
use crate::state::{DeviceEvent, DeviceStateStore};

/// Reads frames from one connection into a `DeviceStateStore`
pub struct Listener<R> {
    frames: FramedRead<R, FrameCodec>,
    store: Arc<DeviceStateStore>,
    stats: Arc<RwLock<ConnectionStats>>,
    idle_timeout: Option<Duration>,
    debug_protocol: bool,
}

impl<R: AsyncRead + Unpin> Listener<R> {
    /// Create a listener over a reader
    pub fn new(
        reader: R,
        store: Arc<DeviceStateStore>,
        stats: Arc<RwLock<ConnectionStats>>,
    ) -> Self {
        Self {
            frames: FramedRead::new(reader, FrameCodec::new()),
            store,
            stats,
            idle_timeout: None,
            debug_protocol: false,
        }
    }

    /// End the loop if nothing arrives for `timeout`
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Log every decoded payload at debug level
    #[must_use]
    pub fn with_debug_protocol(mut self, enabled: bool) -> Self {
        self.debug_protocol = enabled;
        self
    }

    /// Run until the connection ends
    pub async fn run(mut self) -> DisconnectReason {
        let reason = loop {
            let next = match self.idle_timeout {
                Some(limit) => match Runtime::timeout(limit, self.frames.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!("No data received for {:?}", limit);
                        break DisconnectReason::Timeout;
                    }
                },
                None => self.frames.next().await,
            };

            match next {
                None => break DisconnectReason::PeerClosed,
                Some(Err(e)) => break DisconnectReason::NetworkError(e.to_string()),
                Some(Ok(Err(e))) => self.drop_frame(&e).await,
                Some(Ok(Ok(payload))) => self.handle_payload(payload).await,
            }
        };

        let discarded = self.frames.decoder().discarded_bytes();
        if discarded > 0 {
            tracing::debug!("Listener discarded {} bytes while resynchronizing", discarded);
        }
        tracing::debug!("Listener stopped: {:?}", reason);
        reason
    }

    async fn handle_payload(&mut self, payload: Bytes) {
        self.stats.write().await.record_received(payload.len());

        if self.debug_protocol {
            tracing::debug!("<< {}", String::from_utf8_lossy(&payload));
        }

        let message = match Message::from_json(&payload) {
            Ok(message) => message,
            Err(e) => {
                self.drop_frame(&e).await;
                return;
            }
        };

        if let Err(e) = self.store.handle_message(message).await {
            tracing::warn!("Dropping message: {}", e);
            self.stats.write().await.record_dropped(e.to_string());
        }
    }

    async fn drop_frame(&mut self, error: &ProtocolError) {
        tracing::warn!("Dropping frame: {}", error);
        self.stats.write().await.record_dropped(error.to_string());
        self.store.events().emit(DeviceEvent::MessageDropped {
            reason: error.to_string(),
        });
    }
}
