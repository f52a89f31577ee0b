//! Configuration management for the Helios node.
//!
//! Handles loading and validating configuration from JSON files.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/opt/helios/config.json";

/// The server listens on all interfaces, port 80
pub const LISTEN_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 80);

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// BCM pin driving the LED
    #[serde(default = "default_led_pin")]
    pub led_pin: u8,

    /// LED lights up on a low level
    #[serde(default)]
    pub led_active_low: bool,

    /// MCP3008 channel the LDR divider is wired to
    #[serde(default)]
    pub adc_channel: u8,

    /// SPI clock for the ADC in Hz
    #[serde(default = "default_spi_clock_hz")]
    pub spi_clock_hz: u32,

    /// Blink task period in milliseconds
    #[serde(default = "default_blink_interval_ms")]
    pub blink_interval_ms: u64,

    /// Period between light events on `/events/ldr`, in milliseconds
    #[serde(default = "default_sse_interval_ms")]
    pub sse_interval_ms: u64,

    /// Ceiling on simultaneously open connections, streams included
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Time a client gets to deliver its request line and headers
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Serve the dashboard for unknown paths instead of 404
    #[serde(default = "default_true")]
    pub fallback_to_index: bool,

    /// Directory whose files override the bundled web assets
    #[serde(default)]
    pub asset_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_led_pin() -> u8 {
    17
}

fn default_spi_clock_hz() -> u32 {
    1_000_000
}

fn default_blink_interval_ms() -> u64 {
    500
}

fn default_sse_interval_ms() -> u64 {
    250
}

fn default_max_connections() -> usize {
    8
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            led_pin: default_led_pin(),
            led_active_low: false,
            adc_channel: 0,
            spi_clock_hz: default_spi_clock_hz(),
            blink_interval_ms: default_blink_interval_ms(),
            sse_interval_ms: default_sse_interval_ms(),
            max_connections: default_max_connections(),
            request_timeout_ms: default_request_timeout_ms(),
            fallback_to_index: true,
            asset_dir: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.led_pin > 27 {
            return Err(ConfigError::ValidationError(
                "led_pin must be a BCM pin between 0 and 27".to_string(),
            ));
        }

        if self.adc_channel > crate::device::adc::MAX_CHANNEL {
            return Err(ConfigError::ValidationError(
                "adc_channel must be between 0 and 7".to_string(),
            ));
        }

        if self.spi_clock_hz < 10_000 || self.spi_clock_hz > 3_600_000 {
            return Err(ConfigError::ValidationError(
                "spi_clock_hz must be between 10000 and 3600000".to_string(),
            ));
        }

        if self.blink_interval_ms < 10 {
            return Err(ConfigError::ValidationError(
                "blink_interval_ms must be at least 10".to_string(),
            ));
        }

        if self.sse_interval_ms < 10 {
            return Err(ConfigError::ValidationError(
                "sse_interval_ms must be at least 10".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_ms < 100 {
            return Err(ConfigError::ValidationError(
                "request_timeout_ms must be at least 100".to_string(),
            ));
        }

        Ok(())
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    pub fn sse_interval(&self) -> Duration {
        Duration::from_millis(self.sse_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.led_pin, 17);
        assert_eq!(config.blink_interval(), Duration::from_millis(500));
        assert_eq!(config.sse_interval(), Duration::from_millis(250));
        assert_eq!(config.max_connections, 8);
        assert!(config.fallback_to_index);
        assert!(config.asset_dir.is_none());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_json(
            r#"{"led_pin": 4, "led_active_low": true, "sse_interval_ms": 100,
                "fallback_to_index": false, "asset_dir": "/srv/helios"}"#,
        )
        .unwrap();
        assert_eq!(config.led_pin, 4);
        assert!(config.led_active_low);
        assert_eq!(config.sse_interval(), Duration::from_millis(100));
        assert!(!config.fallback_to_index);
        assert_eq!(config.asset_dir, Some(PathBuf::from("/srv/helios")));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for json in [
            r#"{"adc_channel": 8}"#,
            r#"{"max_connections": 0}"#,
            r#"{"blink_interval_ms": 1}"#,
            r#"{"sse_interval_ms": 0}"#,
            r#"{"request_timeout_ms": 5}"#,
            r#"{"led_pin": 40}"#,
        ] {
            assert!(
                matches!(Config::from_json(json), Err(ConfigError::ValidationError(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Config::from_json("{led_pin: 4"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
