//! Type definitions for framegate configuration and state management.
//!
//! This module contains the core types used throughout framegate for:
//! - Rate limiting configuration and state
//! - Upstream fetch configuration
//! - Cleanup configuration for memory management
//! - Error disclosure policy

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

// ============================================================================
// Composable Configuration Traits
// ============================================================================

/// Configuration for rate limiting behavior.
pub trait RateLimitingProvider: Send + Sync {
    /// Returns the rate limiting configuration.
    fn rate_limit_config(&self) -> &RateLimitConfig;

    /// Returns the rate limiter cleanup configuration.
    fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig;
}

/// Configuration for upstream fetching.
pub trait ProxyProvider: Send + Sync {
    /// Returns the proxy configuration.
    fn proxy_config(&self) -> &ProxyConfig;
}

/// Controls how much of an internal failure is revealed to callers.
pub trait DisclosureProvider: Send + Sync {
    /// Returns `true` when internal error details may be sent to clients
    /// (development deployments only).
    fn expose_error_details(&self) -> bool;
}

// ============================================================================
// ConfigProvider - Aggregated trait for full configuration
// ============================================================================

/// Trait for complete configuration injection.
///
/// Combines all specialized configuration traits. Any type implementing the
/// sub-traits is automatically a `ConfigProvider`.
///
/// # Example
///
/// ```
/// use framegate_core::{
///     DisclosureProvider, ProxyConfig, ProxyProvider, RateLimitCleanupConfig,
///     RateLimitConfig, RateLimitingProvider,
/// };
/// use std::time::Duration;
///
/// struct MyConfig;
///
/// impl RateLimitingProvider for MyConfig {
///     fn rate_limit_config(&self) -> &RateLimitConfig {
///         static CONFIG: RateLimitConfig = RateLimitConfig {
///             max_requests: 100,
///             window_duration: Duration::from_secs(60),
///         };
///         &CONFIG
///     }
///
///     fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig {
///         static CONFIG: RateLimitCleanupConfig = RateLimitCleanupConfig {
///             threshold: 10_000,
///             interval: Duration::from_secs(60),
///             grace: Duration::from_secs(60),
///         };
///         &CONFIG
///     }
/// }
///
/// impl ProxyProvider for MyConfig {
///     fn proxy_config(&self) -> &ProxyConfig {
///         static CONFIG: ProxyConfig = ProxyConfig {
///             fetch_timeout: Duration::from_secs(30),
///             probe_timeout: Duration::from_secs(8),
///             max_redirects: 5,
///             max_body_size: 50 * 1024 * 1024,
///             max_response_size: 10 * 1024 * 1024,
///         };
///         &CONFIG
///     }
/// }
///
/// impl DisclosureProvider for MyConfig {
///     fn expose_error_details(&self) -> bool { false }
/// }
/// ```
pub trait ConfigProvider: RateLimitingProvider + ProxyProvider + DisclosureProvider {}

impl<T> ConfigProvider for T where T: RateLimitingProvider + ProxyProvider + DisclosureProvider {}

/// Fixed-window rate limit applied per client.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use framegate_core::RateLimitConfig;
///
/// let config = RateLimitConfig {
///     max_requests: 100,
///     window_duration: Duration::from_secs(60),
/// };
///
/// assert!(config.is_valid());
/// ```
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum number of admissions per client within one window
    pub max_requests: u32,
    /// Length of each fixed window
    pub window_duration: Duration,
}

impl RateLimitConfig {
    /// Returns `true` if the configuration is valid.
    ///
    /// A valid configuration has at least one allowed request and a non-zero window.
    pub fn is_valid(&self) -> bool {
        self.max_requests > 0 && !self.window_duration.is_zero()
    }
}

/// Configuration for eviction of stale rate limit entries.
///
/// Eviction is access-triggered: it runs inside an admission check once the
/// table grows past `threshold` and at least `interval` has passed since the
/// previous sweep. An entry is stale once `now > window_reset_at + grace`.
#[derive(Clone, Debug)]
pub struct RateLimitCleanupConfig {
    /// Number of entries before triggering cleanup (0 = disabled)
    pub threshold: usize,
    /// Minimum interval between cleanup operations
    pub interval: Duration,
    /// How long past its reset an entry is kept
    pub grace: Duration,
}

impl RateLimitCleanupConfig {
    /// Returns `true` if automatic cleanup is enabled.
    pub fn is_enabled(&self) -> bool {
        self.threshold > 0
    }
}

/// Configuration for upstream fetching.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use framegate_core::ProxyConfig;
///
/// let config = ProxyConfig {
///     fetch_timeout: Duration::from_secs(30),
///     probe_timeout: Duration::from_secs(8),
///     max_redirects: 5,
///     max_body_size: ProxyConfig::mb_to_bytes(50),
///     max_response_size: ProxyConfig::mb_to_bytes(10),
/// };
///
/// assert!(config.is_valid());
/// assert_eq!(config.max_body_size_mb(), "50");
/// ```
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Timeout for full page fetches
    pub fetch_timeout: Duration,
    /// Timeout for existence probes
    pub probe_timeout: Duration,
    /// Redirect hops followed before the fetch fails
    pub max_redirects: usize,
    /// Maximum inbound request body size in bytes (0 = unlimited)
    pub max_body_size: usize,
    /// Maximum upstream response body size in bytes (0 = unlimited)
    pub max_response_size: usize,
}

impl ProxyConfig {
    /// Returns `true` if both timeouts are non-zero.
    pub fn is_valid(&self) -> bool {
        !self.fetch_timeout.is_zero() && !self.probe_timeout.is_zero()
    }

    /// Returns the maximum body size formatted for display.
    pub fn max_body_size_mb(&self) -> String {
        if self.max_body_size == 0 {
            "unlimited".to_string()
        } else {
            (self.max_body_size / 1024 / 1024).to_string()
        }
    }

    /// Returns the maximum upstream response size formatted for display.
    pub fn max_response_size_mb(&self) -> String {
        if self.max_response_size == 0 {
            "unlimited".to_string()
        } else {
            (self.max_response_size / 1024 / 1024).to_string()
        }
    }

    /// Converts megabytes to bytes. Returns 0 (unlimited) for 0.
    pub fn mb_to_bytes(mb: usize) -> usize {
        if mb == 0 { 0 } else { mb * 1024 * 1024 }
    }
}

/// Rate limit state for one client.
#[derive(Clone, Debug)]
pub struct RateLimitEntry {
    /// Admission attempts in the current window
    pub count: u32,
    /// Instant at which the current window ends
    pub window_reset_at: Instant,
}

impl RateLimitEntry {
    /// Creates an empty entry whose window ends `window` from `now`.
    pub fn new(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_reset_at: now + window,
        }
    }

    /// Returns `true` once the window (plus `grace`) lies entirely in the past.
    pub fn is_stale(&self, now: Instant, grace: Duration) -> bool {
        now > self.window_reset_at + grace
    }
}

/// Outcome of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Whole seconds until the window resets (0 when allowed)
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    pub(crate) fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    pub(crate) fn deny(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs,
        }
    }
}

/// Rate limiter shared by every request handler.
///
/// Constructed once at startup and cloned into each connection; clones share
/// state. The table lives behind a `tokio::sync::Mutex`, so a client's
/// read-modify-write happens atomically.
///
/// # Example
///
/// ```
/// use framegate_core::RateLimiter;
///
/// let limiter = RateLimiter::new();
/// let shared = limiter.clone();
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    last_cleanup: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Creates a new empty rate limiter.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            last_cleanup: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a reference to the inner mutex-protected map.
    pub fn inner(&self) -> &Arc<Mutex<HashMap<String, RateLimitEntry>>> {
        &self.inner
    }

    pub(crate) fn last_cleanup(&self) -> &Arc<Mutex<Option<Instant>>> {
        &self.last_cleanup
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
