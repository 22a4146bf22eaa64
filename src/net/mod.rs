//! Network runtime helpers
//!
//! Thin wrappers over the tokio primitives the connection layer needs.

#[cfg(test)]
mod tests;

use std::future::Future;
use std::time::Duration;

pub use tokio::net::TcpStream;
pub use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
pub use tokio::task::JoinHandle;

/// Runtime abstraction for common operations
pub struct Runtime;

impl Runtime {
    /// Sleep for the specified duration
    pub async fn sleep(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Run a future with a timeout
    ///
    /// # Errors
    ///
    /// Returns `TimeoutError` if the future does not complete within the specified duration.
    pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(duration, future)
            .await
            .map_err(|_| TimeoutError)
    }

    /// Get current timestamp on the runtime clock
    #[must_use]
    pub fn now() -> tokio::time::Instant {
        tokio::time::Instant::now()
    }

    /// Spawn a task
    pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }
}

/// Timeout error
#[derive(Debug, Clone, Copy)]
pub struct TimeoutError;

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimeoutError {}

/// Open a TCP connection to `addr` within `limit`
///
/// Returns `Err(TimeoutError)` on expiry and `Ok(Err(_))` if the dial itself fails.
pub async fn connect_tcp(
    addr: &str,
    limit: Duration,
) -> Result<std::io::Result<TcpStream>, TimeoutError> {
    Runtime::timeout(limit, TcpStream::connect(addr)).await
}
