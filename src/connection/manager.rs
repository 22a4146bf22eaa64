//! Connection manager for the soundbar control channel

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use futures::SinkExt;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::codec::FramedWrite;

use super::gate::RetryGate;
use super::listener::Listener;
use super::state::{ConnectionEvent, ConnectionState, ConnectionStats, DisconnectReason};
use crate::error::SoundbarError;
use crate::net::{JoinHandle, OwnedReadHalf, OwnedWriteHalf, Runtime, connect_tcp};
use crate::protocol::{FrameCodec, Message};
use crate::state::DeviceStateStore;
use crate::types::SoundbarConfig;

type FrameWriter = FramedWrite<OwnedWriteHalf, FrameCodec>;

/// Owns the device socket
///
/// Writes go through a single connection-scoped lock. Reads happen only on the
/// listener task spawned for each connection. Reconnects are serialized and
/// rate-limited by a retry gate; the explicit [`connect`](Self::connect) call
/// is not subject to the gate.
pub struct ConnectionManager {
    /// Configuration
    config: SoundbarConfig,
    /// Store the listener merges into
    store: Arc<DeviceStateStore>,
    /// Current state
    state: RwLock<ConnectionState>,
    /// Write half of the socket, framed
    writer: Mutex<Option<FrameWriter>>,
    /// Serializes connection attempts and holds the retry gate
    reconnect: Mutex<RetryGate>,
    /// Incremented for every new connection and every teardown
    generation: AtomicU64,
    /// Listener task for the current connection
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
    /// Connection statistics
    stats: Arc<RwLock<ConnectionStats>>,
    /// Event sender
    event_tx: broadcast::Sender<ConnectionEvent>,
    /// Handle passed to listener tasks
    this: Weak<ConnectionManager>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new(config: SoundbarConfig, store: Arc<DeviceStateStore>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Arc::new_cyclic(|this| Self {
            reconnect: Mutex::new(RetryGate::new(config.retry_interval)),
            config,
            store,
            state: RwLock::new(ConnectionState::Disconnected),
            writer: Mutex::new(None),
            generation: AtomicU64::new(0),
            listener: std::sync::Mutex::new(None),
            stats: Arc::new(RwLock::new(ConnectionStats::default())),
            event_tx,
            this: this.clone(),
        })
    }

    /// Get current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Get connection statistics
    pub async fn stats(&self) -> ConnectionStats {
        self.stats.read().await.clone()
    }

    /// Generation of the current (or last) connection
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &SoundbarConfig {
        &self.config
    }

    /// Subscribe to connection events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Connect to the device
    ///
    /// Does nothing if already connected. Not subject to the retry gate.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` or `ConnectionTimeout` if the socket cannot
    /// be opened.
    pub async fn connect(&self) -> Result<(), SoundbarError> {
        let _gate = self.reconnect.lock().await;
        if self.state().await.is_connected() {
            return Ok(());
        }
        self.establish().await
    }

    /// Reconnect if disconnected, subject to the retry gate
    ///
    /// Returns `true` if this call opened the connection, `false` if it was
    /// already connected (possibly by a concurrent caller).
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if an attempt was made within the retry interval,
    /// or the connection error of this attempt.
    pub async fn ensure_connected(&self) -> Result<bool, SoundbarError> {
        if self.state().await.is_connected() {
            return Ok(false);
        }

        let mut gate = self.reconnect.lock().await;
        // Another caller may have reconnected while we waited
        if self.state().await.is_connected() {
            return Ok(false);
        }

        if let Err(retry_in) = gate.try_acquire(Runtime::now()) {
            tracing::debug!("Reconnect suppressed, next attempt in {:?}", retry_in);
            return Err(SoundbarError::NotConnected { retry_in });
        }

        self.stats.write().await.reconnect_attempts += 1;
        tracing::info!("Reconnecting to {}", self.config.address());
        self.establish().await?;
        Ok(true)
    }

    /// Send a message to the device
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the frame could not be
    /// written even after one reconnect.
    pub async fn send_message(&self, message: &Message) -> Result<(), SoundbarError> {
        let payload = message.to_json()?;
        if self.config.debug_protocol {
            tracing::debug!(">> {}", String::from_utf8_lossy(&payload));
        }
        self.send(Bytes::from(payload)).await
    }

    /// Send a plaintext payload as one encrypted frame
    ///
    /// Reconnects first if disconnected. If the write fails, the connection is
    /// dropped, one reconnect is attempted and the write is retried once.
    ///
    /// # Errors
    ///
    /// Returns the reconnect error, or the error of the retried write.
    pub async fn send(&self, payload: Bytes) -> Result<(), SoundbarError> {
        self.ensure_connected().await?;

        match self.write_frame(payload.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Write failed, retrying after reconnect: {}", e);
                self.ensure_connected().await?;
                self.write_frame(payload).await
            }
        }
    }

    /// Close the connection
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with `connect`.
    pub async fn disconnect(&self) -> Result<(), SoundbarError> {
        let mut writer = self.writer.lock().await;
        if writer.is_none() && !self.state().await.is_active() {
            return Ok(());
        }
        if let Some(mut sink) = writer.take() {
            let _ = Runtime::timeout(self.config.write_timeout, sink.close()).await;
        }
        self.teardown(&mut writer, DisconnectReason::UserRequested, true)
            .await;
        Ok(())
    }

    async fn establish(&self) -> Result<(), SoundbarError> {
        let address = self.config.address();
        self.set_state(ConnectionState::Connecting).await;
        tracing::debug!("Connecting to {}", address);

        let stream = match connect_tcp(&address, self.config.connection_timeout).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let error = SoundbarError::ConnectionFailed {
                    address,
                    message: e.to_string(),
                    source: Some(Box::new(e)),
                };
                return Err(self.fail(error).await);
            }
            Err(_) => {
                let error = SoundbarError::ConnectionTimeout {
                    duration: self.config.connection_timeout,
                };
                return Err(self.fail(error).await);
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }
        let (read, write) = stream.into_split();

        let generation = {
            let mut writer = self.writer.lock().await;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *writer = Some(FramedWrite::new(write, FrameCodec::new()));
            self.stats.write().await.connected_at = Some(std::time::Instant::now());
            self.set_state(ConnectionState::Connected).await;
            self.spawn_listener(read, generation);
            generation
        };

        tracing::info!("Connected to {} (generation {})", address, generation);
        self.send_event(ConnectionEvent::Connected {
            address,
            generation,
        });
        Ok(())
    }

    async fn fail(&self, error: SoundbarError) -> SoundbarError {
        tracing::warn!("Connection attempt failed: {}", error);
        self.stats.write().await.last_error = Some(error.to_string());
        self.set_state(ConnectionState::Disconnected).await;
        self.send_event(ConnectionEvent::Error {
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        });
        error
    }

    fn spawn_listener(&self, read: OwnedReadHalf, generation: u64) {
        let listener = Listener::new(read, self.store.clone(), self.stats.clone())
            .with_idle_timeout(self.config.idle_timeout)
            .with_debug_protocol(self.config.debug_protocol);
        let manager = self.this.clone();

        let handle = Runtime::spawn(async move {
            let reason = listener.run().await;
            if let Some(manager) = manager.upgrade() {
                manager.on_listener_exit(generation, reason).await;
            }
        });

        if let Ok(mut slot) = self.listener.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    async fn on_listener_exit(&self, generation: u64, reason: DisconnectReason) {
        let mut writer = self.writer.lock().await;
        if self.generation() != generation {
            tracing::trace!("Ignoring exit of stale listener (generation {})", generation);
            return;
        }
        tracing::info!("Connection lost: {:?}", reason);
        // Running on the listener task itself; must not abort it
        self.teardown(&mut writer, reason, false).await;
    }

    async fn write_frame(&self, payload: Bytes) -> Result<(), SoundbarError> {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(SoundbarError::Disconnected);
        };

        let len = payload.len();
        let result = match Runtime::timeout(self.config.write_timeout, sink.send(payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SoundbarError::NetworkError(e)),
            Err(_) => Err(SoundbarError::WriteTimeout {
                duration: self.config.write_timeout,
            }),
        };

        match result {
            Ok(()) => {
                tracing::trace!("Sent frame with {} byte payload", len);
                self.stats.write().await.record_sent(len);
                Ok(())
            }
            Err(e) => {
                self.stats.write().await.last_error = Some(e.to_string());
                self.teardown(&mut writer, DisconnectReason::NetworkError(e.to_string()), true)
                    .await;
                Err(e)
            }
        }
    }

    /// Drop the current connection; the caller holds the writer lock
    async fn teardown(
        &self,
        writer: &mut Option<FrameWriter>,
        reason: DisconnectReason,
        abort_listener: bool,
    ) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        writer.take();

        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                if abort_listener {
                    handle.abort();
                }
            }
        }

        self.stats.write().await.connected_at = None;
        self.set_state(ConnectionState::Disconnected).await;
        self.send_event(ConnectionEvent::Disconnected { reason });
    }

    /// Set connection state and emit event
    async fn set_state(&self, new_state: ConnectionState) {
        let old_state = {
            let mut state = self.state.write().await;
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            self.send_event(ConnectionEvent::StateChanged {
                old: old_state,
                new: new_state,
            });
        }
    }

    /// Send an event
    fn send_event(&self, event: ConnectionEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
