//! Configuration types for the control panel core
//!
//! All durations are plain integers so the structures deserialize from
//! environment-derived values and JSON alike.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default remote API base
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080/api";

/// Main panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Base URL of the remote API, endpoints are appended to it
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Connection monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl PanelConfig {
    /// Create a configuration for the given API base with default settings
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            gateway: GatewayConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_base.is_empty() {
            return Err(crate::Error::config("API base URL cannot be empty"));
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "API base URL must use http or https: {}",
                self.api_base
            )));
        }

        self.gateway.validate()?;
        self.monitor.validate()?;

        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

/// Request gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Total attempts for a request that fails at the transport level
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Fixed delay between attempts (in milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout applied by the transport (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Validate the gateway configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(crate::Error::config(format!(
                "max_attempts must be between 1 and 10, got {}",
                self.max_attempts
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("request_timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Delay between attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Connection monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between periodic health probes (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Wait after a host "online" signal before re-probing (in milliseconds)
    ///
    /// A link coming up does not mean the API is reachable yet.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Capacity of the monitor's broadcast channel
    ///
    /// Subscribers that fall further behind than this miss events.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl MonitorConfig {
    /// Validate the monitor configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("poll_interval_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    /// Interval between periodic probes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Settle delay after an online signal
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_event_channel_capacity() -> usize {
    64
}
