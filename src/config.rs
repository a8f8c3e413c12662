use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::http::request::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_SIZE};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,

    /// Initial size of the per-connection read buffer.
    pub buffer_size: usize,

    /// Upper bound for the request line plus header section. Requests over
    /// it are answered with 431.
    pub max_header_size: usize,
    /// Upper bound for a request body. Requests over it are answered with 413.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 42069,
            buffer_size: 1024,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path, error = %err, "failed to read config, falling back to defaults");
                return ServerConfig::default();
            }
        };

        Self::from_toml(&content).unwrap_or_else(|err| {
            tracing::warn!(path, error = %err, "failed to deserialize config, falling back to defaults");
            ServerConfig::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ServerConfig>(content)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}
