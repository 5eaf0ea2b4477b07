//! Cache configuration.
//!
//! Controls the document cache via `blockpress.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_DOCUMENT_TTL_SECS: u64 = 600;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Cache configuration from `blockpress.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve rendered documents from the cache.
    pub enabled: bool,
    /// Lifetime of a rendered document; zero keeps documents until invalidated.
    pub document_ttl_secs: u64,
    /// Interval between sweeps of expired entries.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            document_ttl_secs: DEFAULT_DOCUMENT_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            document_ttl_secs: settings.document_ttl_secs,
            sweep_interval_secs: settings.sweep_interval.as_secs(),
        }
    }
}

impl CacheConfig {
    /// TTL passed to the store; `None` means entries never expire.
    pub fn document_ttl(&self) -> Option<Duration> {
        (self.document_ttl_secs > 0).then(|| Duration::from_secs(self.document_ttl_secs))
    }

    /// Sweep interval, clamped to at least one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.document_ttl(), Some(Duration::from_secs(600)));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn zero_ttl_means_no_expiry() {
        let config = CacheConfig {
            document_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.document_ttl(), None);
    }

    #[test]
    fn sweep_interval_clamps_to_one_second() {
        let config = CacheConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }
}
