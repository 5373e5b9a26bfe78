//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => bail!("unknown log format: {other}"),
        }
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `ALERT_SINK_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `ALERT_SINK_PORT`: The port to listen on (default: 8080)
/// - `ALERT_SINK_LOG_FORMAT`: `pretty` or `json` (default: "pretty")
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `ALERT_SINK_PORT` is set but cannot be parsed as a valid port number
    /// - `ALERT_SINK_LOG_FORMAT` is set to an unknown format
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("ALERT_SINK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("ALERT_SINK_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("ALERT_SINK_PORT must be a port number")?
            .unwrap_or(8080);

        let log_format = std::env::var("ALERT_SINK_LOG_FORMAT")
            .ok()
            .map(|f| f.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            log_format,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        let config = Config {
            host: "not a host".to_string(),
            ..Config::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
