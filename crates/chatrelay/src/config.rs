//! Server configuration.
//!
//! These are the values the launcher supplies: where to listen and how
//! many clients to admit. Sensible defaults are provided, so tests and
//! embedders only override what they care about.

use chatrelay_protocol::DEFAULT_MAX_FRAME_LEN;
use chatrelay_registry::{DEFAULT_OUTBOUND_CAPACITY, RegistryConfig};

use crate::RelayError;

/// Configuration for a [`ChatServer`](crate::ChatServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to, e.g. `"127.0.0.1"` or `"0.0.0.0"`.
    pub bind_host: String,

    /// TCP port to listen on. `0` lets the OS pick one.
    pub bind_port: u16,

    /// Maximum number of simultaneously registered clients. Must be ≥ 1.
    pub max_clients: usize,

    /// Largest accepted frame payload, in bytes.
    pub max_frame_len: usize,

    /// Messages queued per client before it is dropped as too slow.
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 8005,
            max_clients: 5,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        if self.bind_host.contains(':') && !self.bind_host.starts_with('[') {
            // Bare IPv6 literal.
            format!("[{}]:{}", self.bind_host, self.bind_port)
        } else {
            format!("{}:{}", self.bind_host, self.bind_port)
        }
    }

    /// Checks the values that can't be fixed up silently.
    ///
    /// # Errors
    /// Returns [`RelayError::Config`] if `max_clients`, `max_frame_len`
    /// or `outbound_capacity` is zero, or the host is empty.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.bind_host.is_empty() {
            return Err(RelayError::Config("bind host must not be empty".into()));
        }
        if self.max_clients == 0 {
            return Err(RelayError::Config("max_clients must be at least 1".into()));
        }
        if self.max_frame_len == 0 {
            return Err(RelayError::Config("max_frame_len must be at least 1".into()));
        }
        if self.outbound_capacity == 0 {
            return Err(RelayError::Config("outbound_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// The registry settings derived from this config.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_clients: self.max_clients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_launcher_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8005");
        assert_eq!(config.max_clients, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bind_addr_brackets_ipv6() {
        let config = ServerConfig {
            bind_host: "::1".into(),
            bind_port: 9000,
            ..ServerConfig::default()
        };
        assert_eq!(config.bind_addr(), "[::1]:9000");
    }

    #[test]
    fn test_validate_zero_max_clients_fails() {
        let config = ServerConfig {
            max_clients: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_validate_zero_frame_len_fails() {
        let config = ServerConfig {
            max_frame_len: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_outbound_capacity_fails() {
        let config = ServerConfig {
            outbound_capacity: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_validate_empty_host_fails() {
        let config = ServerConfig {
            bind_host: String::new(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
