use std::time::Duration;

use crate::error::SoundbarError;
use crate::protocol::DEFAULT_PORT;

/// Environment variable holding the device address
pub const ENV_HOST: &str = "SOUNDBAR_IP";
/// Environment variable holding the control port
pub const ENV_PORT: &str = "SOUNDBAR_PORT";

/// Configuration for soundbar client behavior
#[derive(Debug, Clone)]
pub struct SoundbarConfig {
    /// Device hostname or IP address
    pub host: String,

    /// Control channel TCP port (default: 9741)
    pub port: u16,

    /// Timeout for connection attempts (default: 10 seconds)
    pub connection_timeout: Duration,

    /// Timeout for writing a single frame (default: 5 seconds)
    pub write_timeout: Duration,

    /// Drop the connection if nothing is received for this long (default: off)
    pub idle_timeout: Option<Duration>,

    /// Minimum interval between reconnect attempts (default: 5 seconds)
    pub retry_interval: Duration,

    /// Capacity of the event broadcast channels (default: 100)
    pub event_capacity: usize,

    /// Log every decoded payload at debug level
    pub debug_protocol: bool,
}

impl Default for SoundbarConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connection_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            idle_timeout: None,
            retry_interval: Duration::from_secs(5),
            event_capacity: 100,
            debug_protocol: false,
        }
    }
}

impl SoundbarConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SoundbarConfigBuilder {
        SoundbarConfigBuilder::default()
    }

    /// Build a config from `SOUNDBAR_IP` and the optional `SOUNDBAR_PORT`
    ///
    /// # Errors
    ///
    /// Returns `SoundbarError::InvalidConfig` if the host is missing or the
    /// port does not parse.
    pub fn from_env() -> Result<Self, SoundbarError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, SoundbarError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_HOST).ok_or_else(|| SoundbarError::InvalidConfig {
            message: format!("{ENV_HOST} is not set"),
        })?;

        let mut builder = Self::builder().host(host);
        if let Some(port) = lookup(ENV_PORT) {
            let port = port.parse().map_err(|_| SoundbarError::InvalidConfig {
                message: format!("{ENV_PORT} is not a valid port: {port}"),
            })?;
            builder = builder.port(port);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// `host:port` string used to dial the device
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the configuration for values that cannot work
    ///
    /// # Errors
    ///
    /// Returns `SoundbarError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<(), SoundbarError> {
        if self.host.trim().is_empty() {
            return Err(SoundbarError::InvalidConfig {
                message: "host must not be empty".to_string(),
            });
        }
        if self.retry_interval.is_zero() {
            return Err(SoundbarError::InvalidConfig {
                message: "retry interval must be positive".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(SoundbarError::InvalidConfig {
                message: "event capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for `SoundbarConfig`
#[derive(Debug, Clone, Default)]
pub struct SoundbarConfigBuilder {
    config: SoundbarConfig,
}

impl SoundbarConfigBuilder {
    /// Set device host
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set control port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Set per-frame write timeout
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Enable silent-peer detection
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Set minimum interval between reconnect attempts
    #[must_use]
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Set event channel capacity
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Enable protocol debug logging
    #[must_use]
    pub fn debug_protocol(mut self, enable: bool) -> Self {
        self.config.debug_protocol = enable;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SoundbarConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_env_host_only() {
        let config = SoundbarConfig::from_lookup(lookup(&[(ENV_HOST, "192.168.1.113")])).unwrap();
        assert_eq!(config.host, "192.168.1.113");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.address(), "192.168.1.113:9741");
    }

    #[test]
    fn test_from_env_with_port() {
        let config =
            SoundbarConfig::from_lookup(lookup(&[(ENV_HOST, "soundbar.lan"), (ENV_PORT, "9999")]))
                .unwrap();
        assert_eq!(config.port, 9999);
    }

    #[test]
    fn test_from_env_missing_host() {
        let err = SoundbarConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, SoundbarError::InvalidConfig { .. }));
    }

    #[test]
    fn test_from_env_bad_port() {
        let err = SoundbarConfig::from_lookup(lookup(&[(ENV_HOST, "h"), (ENV_PORT, "99999")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }
}
