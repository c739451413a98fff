//! Observer configuration

use anyhow::Result;
use observer_lib::feed::FeedConfig;
use serde::Deserialize;
use std::time::Duration;

/// Observer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    /// Backend base URL for snapshot fetches
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// WebSocket endpoint for the cluster event feed
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// API server port for health/metrics/state
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Delay before reconnecting a lost feed connection, in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Feed heartbeat interval in seconds
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_feed_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            feed_url: default_feed_url(),
            api_port: default_api_port(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl ObserverConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("OBSERVER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Feed settings derived from this configuration
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed_url.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ObserverConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.reconnect_delay_ms, 3000);

        let feed = config.feed_config();
        assert_eq!(feed.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(feed.heartbeat_interval, Duration::from_secs(30));
    }
}
