//! Connection state management

use std::time::Instant;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// TCP connection in progress
    Connecting,
    /// Connected, listener running
    Connected,
}

impl ConnectionState {
    /// Check if currently connected or connecting
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Check if fully connected
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Connection events
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// State changed
    StateChanged {
        /// The previous state
        old: ConnectionState,
        /// The new state
        new: ConnectionState,
    },
    /// Connection established
    Connected {
        /// The `host:port` that was dialed
        address: String,
        /// Connection generation
        generation: u64,
    },
    /// Connection lost or closed
    Disconnected {
        /// The reason for disconnection
        reason: DisconnectReason,
    },
    /// Error occurred
    Error {
        /// The error message
        message: String,
        /// Whether the error is recoverable
        recoverable: bool,
    },
}

/// Reason for disconnection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// User requested disconnect
    UserRequested,
    /// Peer closed the socket
    PeerClosed,
    /// Socket read or write error
    NetworkError(String),
    /// Nothing received within the idle timeout
    Timeout,
}

/// Connection statistics
///
/// Byte counters count plaintext payload bytes, not frame bytes.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Time the current connection was established
    pub connected_at: Option<Instant>,
    /// Number of payload bytes sent
    pub bytes_sent: u64,
    /// Number of payload bytes received
    pub bytes_received: u64,
    /// Number of frames written
    pub frames_sent: u64,
    /// Number of frames decoded
    pub frames_received: u64,
    /// Frames or messages dropped as malformed
    pub frames_dropped: u64,
    /// Number of reconnection attempts
    pub reconnect_attempts: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Get connection uptime
    #[must_use]
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.connected_at.map(|t| t.elapsed())
    }

    /// Record a frame sent
    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.frames_sent += 1;
    }

    /// Record a frame received
    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.frames_received += 1;
    }

    /// Record a dropped frame or message
    pub fn record_dropped(&mut self, reason: String) {
        self.frames_dropped += 1;
        self.last_error = Some(reason);
    }
}
