//! Listener configuration.

use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port (0 = ephemeral)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Default timeout of the await gate
    #[serde(default = "default_await_timeout_secs")]
    pub await_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_await_timeout_secs() -> u64 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            await_timeout_secs: default_await_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Loopback listener on an ephemeral port, as tests use it.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_secs(self.await_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.await_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_invalid_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ServerError::InvalidAddress(_))
        ));
    }
}
