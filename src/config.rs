//! Configuration Module
//!
//! Handles loading and managing engine configuration from environment variables.

use std::env;
use std::time::Duration;

/// Engine configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in seconds applied to sync-tier cache entries
    pub cache_ttl: u64,
    /// Reconciler scan interval in seconds (must stay below `cache_ttl`)
    pub scan_interval: u64,
    /// Remaining-TTL threshold in seconds below which an entry is reconciled
    pub ttl_warning_threshold: u64,
    /// Maximum keys returned per pattern scan batch
    pub scan_batch_size: usize,
    /// Logout flush timeout in milliseconds
    pub flush_timeout_ms: u64,
    /// Delivery attempts before a persistence job is dead-lettered
    pub max_job_attempts: u32,
    /// Number of persistence runner workers
    pub runner_workers: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL` - Sync-tier entry TTL in seconds (default: 7200)
    /// - `SCAN_INTERVAL` - Reconciler interval in seconds (default: 900)
    /// - `TTL_WARNING_THRESHOLD` - Reconcile-below threshold in seconds (default: 300)
    /// - `SCAN_BATCH_SIZE` - Keys per scan batch (default: 256)
    /// - `FLUSH_TIMEOUT_MS` - Logout flush timeout in milliseconds (default: 5000)
    /// - `MAX_JOB_ATTEMPTS` - Job attempts before dead-letter (default: 5)
    /// - `RUNNER_WORKERS` - Persistence worker count (default: 2)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            cache_ttl: env_or("CACHE_TTL", 7200),
            scan_interval: env_or("SCAN_INTERVAL", 900),
            ttl_warning_threshold: env_or("TTL_WARNING_THRESHOLD", 300),
            scan_batch_size: env_or("SCAN_BATCH_SIZE", 256),
            flush_timeout_ms: env_or("FLUSH_TIMEOUT_MS", 5000),
            max_job_attempts: env_or("MAX_JOB_ATTEMPTS", 5),
            runner_workers: env_or("RUNNER_WORKERS", 2),
            server_port: env_or("SERVER_PORT", 3000),
        }
    }

    /// Validates inter-field constraints.
    ///
    /// The scan interval must be strictly below the entry TTL: an entry
    /// written immediately after a pass must still be seen by a later pass
    /// before its TTL reaches zero. Expiry-before-persist is a bug, not a
    /// tolerated race.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_ttl == 0 || self.scan_interval == 0 {
            return Err("CACHE_TTL and SCAN_INTERVAL must be non-zero".to_string());
        }
        if self.scan_interval >= self.cache_ttl {
            return Err(format!(
                "SCAN_INTERVAL ({}s) must be strictly below CACHE_TTL ({}s)",
                self.scan_interval, self.cache_ttl
            ));
        }
        if self.ttl_warning_threshold >= self.cache_ttl {
            return Err(format!(
                "TTL_WARNING_THRESHOLD ({}s) must be below CACHE_TTL ({}s)",
                self.ttl_warning_threshold, self.cache_ttl
            ));
        }
        Ok(())
    }

    /// Sync-tier entry TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Reconciler scan interval as a Duration.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    /// Warning threshold as a Duration.
    pub fn ttl_warning_threshold(&self) -> Duration {
        Duration::from_secs(self.ttl_warning_threshold)
    }

    /// Logout flush timeout as a Duration.
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: 7200,
            scan_interval: 900,
            ttl_warning_threshold: 300,
            scan_batch_size: 256,
            flush_timeout_ms: 5000,
            max_job_attempts: 5,
            runner_workers: 2,
            server_port: 3000,
        }
    }
}

/// Reads an environment variable, falling back to a default on absence or
/// parse failure.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_ttl, 7200);
        assert_eq!(config.scan_interval, 900);
        assert_eq!(config.ttl_warning_threshold, 300);
        assert_eq!(config.scan_batch_size, 256);
        assert_eq!(config.flush_timeout_ms, 5000);
        assert_eq!(config.max_job_attempts, 5);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_scan_interval_above_ttl() {
        let config = Config {
            cache_ttl: 600,
            scan_interval: 600,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_intervals() {
        let config = Config {
            scan_interval: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_warning_threshold_above_ttl() {
        let config = Config {
            cache_ttl: 200,
            scan_interval: 100,
            ttl_warning_threshold: 300,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(7200));
        assert_eq!(config.scan_interval(), Duration::from_secs(900));
        assert_eq!(config.flush_timeout(), Duration::from_millis(5000));
    }
}
