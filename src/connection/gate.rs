//! Reconnect rate limiting

use std::time::Duration;

use tokio::time::Instant;

/// Allows at most one reconnect attempt per interval
#[derive(Debug, Clone)]
pub struct RetryGate {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl RetryGate {
    /// Create an open gate
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// Consume the gate for an attempt at `now`
    ///
    /// # Errors
    ///
    /// Returns the time left in the window if an attempt was made too recently.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        if let Some(remaining) = self.remaining(now) {
            return Err(remaining);
        }
        self.last_attempt = Some(now);
        Ok(())
    }

    /// Time until the next attempt is allowed, `None` if open
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_attempt?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.interval).then(|| self.interval - elapsed)
    }

    /// Interval between attempts
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_allowed() {
        let mut gate = RetryGate::new(Duration::from_secs(5));
        assert!(gate.try_acquire(Instant::now()).is_ok());
    }

    #[test]
    fn test_second_attempt_inside_window_refused() {
        let mut gate = RetryGate::new(Duration::from_secs(5));
        let start = Instant::now();
        gate.try_acquire(start).unwrap();

        let retry_in = gate.try_acquire(start + Duration::from_secs(2)).unwrap_err();
        assert_eq!(retry_in, Duration::from_secs(3));

        // A refused attempt does not extend the window
        assert!(gate.try_acquire(start + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_remaining() {
        let mut gate = RetryGate::new(Duration::from_secs(5));
        let start = Instant::now();
        assert_eq!(gate.remaining(start), None);

        gate.try_acquire(start).unwrap();
        assert_eq!(
            gate.remaining(start + Duration::from_secs(1)),
            Some(Duration::from_secs(4))
        );
        assert_eq!(gate.remaining(start + Duration::from_secs(6)), None);
    }
}
