use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings of the HTTP host.
///
/// ```toml
/// addr = "0.0.0.0:8080"
/// expose_error_details = false
/// max_body_bytes = 65536
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub addr: SocketAddr,
    /// Include the message of 5xx errors in responses.
    pub expose_error_details: bool,
    /// Larger request bodies are rejected with 413.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            expose_error_details: false,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl HttpConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }
}
