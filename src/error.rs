use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors that can occur while talking to a soundbar
#[derive(Debug, Error)]
pub enum SoundbarError {
    // ===== Connection Errors =====
    /// Failed to establish connection to the device
    #[error("connection failed to {address}: {message}")]
    ConnectionFailed {
        /// The `host:port` that was dialed
        address: String,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection attempt timed out
    #[error("connection timeout after {duration:?}")]
    ConnectionTimeout {
        /// The duration of the timeout
        duration: Duration,
    },

    /// Not connected, and the retry gate refused a reconnect attempt
    #[error("not connected (next reconnect allowed in {retry_in:?})")]
    NotConnected {
        /// Time until the retry gate opens again
        retry_in: Duration,
    },

    /// Connection was closed while an operation was in flight
    #[error("device disconnected")]
    Disconnected,

    /// Writing a frame to the socket timed out
    #[error("write timed out after {duration:?}")]
    WriteTimeout {
        /// The duration of the timeout
        duration: Duration,
    },

    // ===== I/O Errors =====
    /// Network I/O error
    #[error("network error: {0}")]
    NetworkError(#[from] io::Error),

    // ===== Protocol Errors =====
    /// Wire protocol error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // ===== Validation Errors =====
    /// A value fell outside the range the device accepts
    #[error("invalid {name}: {value} (expected {min}..={max})")]
    InvalidValue {
        /// The name of the value
        name: &'static str,
        /// The rejected value
        value: i64,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },

    /// Invalid parameter provided
    #[error("invalid parameter: {name} - {message}")]
    InvalidParameter {
        /// The name of the parameter
        name: String,
        /// Description of the error
        message: String,
    },

    /// Configuration could not be built or is inconsistent
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
    },
}

impl SoundbarError {
    /// Check if this error is recoverable by retrying
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::NotConnected { .. }
                | Self::Disconnected
                | Self::WriteTimeout { .. }
                | Self::NetworkError(_)
        )
    }

    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected
                | Self::NotConnected { .. }
                | Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::WriteTimeout { .. }
                | Self::NetworkError(_)
        )
    }

    /// Check if the request was rejected before any network I/O
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidValue { .. } | Self::InvalidParameter { .. }
        )
    }
}

/// Result type alias for soundbar operations
pub type Result<T> = std::result::Result<T, SoundbarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SoundbarError::InvalidValue {
            name: "volume",
            value: 150,
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "invalid volume: 150 (expected 0..=100)");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(SoundbarError::Disconnected.is_recoverable());
        assert!(
            SoundbarError::NotConnected {
                retry_in: Duration::from_secs(3)
            }
            .is_recoverable()
        );

        let err = SoundbarError::InvalidValue {
            name: "eq",
            value: 19,
            min: 0,
            max: 18,
        };
        assert!(!err.is_recoverable());
        assert!(err.is_validation());
    }

    #[test]
    fn test_error_is_connection_lost() {
        assert!(SoundbarError::Disconnected.is_connection_lost());
        let err = SoundbarError::ConnectionFailed {
            address: "10.0.0.2:9741".to_string(),
            message: "refused".to_string(),
            source: None,
        };
        assert!(err.is_connection_lost());
        assert!(!err.is_validation());

        // A write on a dead socket
        let err: SoundbarError = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe").into();
        assert!(err.is_connection_lost());
        assert!(
            SoundbarError::WriteTimeout {
                duration: Duration::from_millis(300)
            }
            .is_connection_lost()
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err: SoundbarError = io_err.into();

        assert!(matches!(err, SoundbarError::NetworkError(_)));
    }

    #[test]
    fn test_error_from_protocol() {
        let err: SoundbarError = ProtocolError::MisalignedFrame { length: 17 }.into();
        assert!(matches!(err, SoundbarError::Protocol(_)));
        assert!(!err.is_connection_lost());
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SoundbarError>();
    }
}
