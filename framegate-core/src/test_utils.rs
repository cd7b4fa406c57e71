//! Test utilities for framegate.
//!
//! This module provides shared test configuration types used across unit tests.
//! It is only compiled when running tests (`#[cfg(test)]`).

use crate::defaults;
use crate::types::{
    DisclosureProvider, ProxyConfig, ProxyProvider, RateLimitCleanupConfig, RateLimitConfig,
    RateLimitingProvider,
};
use std::time::Duration;

/// Shared test configuration for unit tests.
///
/// Implements all configuration traits with the production defaults and
/// builder methods for customization.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub rate_limit: RateLimitConfig,
    pub cleanup: RateLimitCleanupConfig,
    pub proxy: ProxyConfig,
    pub expose_error_details: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig {
                max_requests: defaults::RATE_LIMIT_REQUESTS,
                window_duration: defaults::RATE_LIMIT_WINDOW,
            },
            // Cleanup stays off so tests see every entry they create
            cleanup: RateLimitCleanupConfig {
                threshold: 0,
                interval: defaults::RATE_LIMIT_CLEANUP_INTERVAL,
                grace: defaults::RATE_LIMIT_GRACE,
            },
            proxy: ProxyConfig {
                fetch_timeout: defaults::FETCH_TIMEOUT,
                probe_timeout: defaults::PROBE_TIMEOUT,
                max_redirects: defaults::MAX_REDIRECTS,
                max_body_size: defaults::MAX_BODY_SIZE,
                max_response_size: defaults::MAX_RESPONSE_SIZE,
            },
            expose_error_details: false,
        }
    }
}

impl TestConfig {
    /// Create a new test configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure rate limiting.
    pub fn with_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.rate_limit = RateLimitConfig {
            max_requests,
            window_duration: Duration::from_secs(window_secs),
        };
        self
    }

    /// Configure cleanup threshold, interval and grace.
    pub fn with_cleanup(mut self, threshold: usize, interval_secs: u64, grace_secs: u64) -> Self {
        self.cleanup = RateLimitCleanupConfig {
            threshold,
            interval: Duration::from_secs(interval_secs),
            grace: Duration::from_secs(grace_secs),
        };
        self
    }

    /// Configure the full-fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.proxy.fetch_timeout = timeout;
        self
    }

    /// Configure the inbound body ceiling.
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.proxy.max_body_size = bytes;
        self
    }

    /// Configure the upstream response ceiling.
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.proxy.max_response_size = bytes;
        self
    }

    /// Expose internal error details, as a development deployment would.
    pub fn with_error_details(mut self) -> Self {
        self.expose_error_details = true;
        self
    }
}

impl RateLimitingProvider for TestConfig {
    fn rate_limit_config(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig {
        &self.cleanup
    }
}

impl ProxyProvider for TestConfig {
    fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }
}

impl DisclosureProvider for TestConfig {
    fn expose_error_details(&self) -> bool {
        self.expose_error_details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TestConfig::new();
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_duration, Duration::from_secs(60));
        assert!(!config.cleanup.is_enabled());
        assert_eq!(config.cleanup.grace, Duration::from_secs(60));
        assert_eq!(config.proxy.max_body_size, 50 * 1024 * 1024);
        assert_eq!(config.proxy.max_response_size, 10 * 1024 * 1024);
        assert!(!config.expose_error_details);
    }

    #[test]
    fn test_builder_methods() {
        let config = TestConfig::new()
            .with_rate_limit(3, 60)
            .with_cleanup(10, 1, 5)
            .with_max_body_size(1024)
            .with_error_details();

        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.cleanup.threshold, 10);
        assert_eq!(config.cleanup.grace, Duration::from_secs(5));
        assert_eq!(config.proxy.max_body_size, 1024);
        assert!(config.expose_error_details);
    }
}
