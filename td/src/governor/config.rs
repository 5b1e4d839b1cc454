//! Governor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache and rate-limit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// How long a successful result stays cached, in seconds
    #[serde(rename = "cache-ttl-secs", default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Max research calls per identity per window
    #[serde(rename = "rate-limit-max", default = "default_rate_limit_max")]
    pub rate_limit_max: u32,

    /// Rate limit window duration in seconds
    #[serde(rename = "rate-limit-window-secs", default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_rate_limit_max() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    24 * 60 * 60
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            rate_limit_max: default_rate_limit_max(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl GovernorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub(crate) fn cache_ttl_ms(&self) -> i64 {
        self.cache_ttl().as_millis() as i64
    }

    pub(crate) fn rate_window_ms(&self) -> i64 {
        self.rate_window().as_millis() as i64
    }
}
