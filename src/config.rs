//! Configuration management for framegate.
//!
//! This module handles loading and caching configuration from environment variables.
//! All configurations are computed once at first access and cached for the lifetime
//! of the application using `once_cell::sync::Lazy`.
//!
//! Every `compute_*` function takes the variable lookup as a parameter, so the
//! parsing rules can be tested without touching the process environment.
//!
//! # Example
//!
//! ```
//! use framegate::config;
//!
//! let rate_config = config::get_rate_limit_config();
//! println!("Max requests: {}", rate_config.max_requests);
//!
//! let proxy_config = config::get_proxy_config();
//! println!("Fetch timeout: {:?}", proxy_config.fetch_timeout);
//! ```

use std::env::{self, VarError};
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::env_vars;
use framegate_core::defaults;
use framegate_core::{
    DisclosureProvider, ProxyConfig, ProxyProvider, RateLimitCleanupConfig, RateLimitConfig,
    RateLimitingProvider,
};

// ============================================================================
// Cached Configuration (computed once at first access)
// ============================================================================

static RATE_LIMIT_CONFIG: Lazy<RateLimitConfig> =
    Lazy::new(|| compute_rate_limit_config(process_env));
static RATE_LIMIT_CLEANUP_CONFIG: Lazy<RateLimitCleanupConfig> =
    Lazy::new(|| compute_rate_limit_cleanup_config(process_env));
static PROXY_CONFIG: Lazy<ProxyConfig> = Lazy::new(|| compute_proxy_config(process_env));
static EXPOSE_ERROR_DETAILS: Lazy<bool> =
    Lazy::new(|| compute_expose_error_details(process_env));

/// Value of `APP_ENV` that enables error detail disclosure.
const DEVELOPMENT_ENV: &str = "development";

// ============================================================================
// Internal Helpers
// ============================================================================

fn process_env(key: &str) -> Result<String, VarError> {
    env::var(key)
}

/// Parses an environment variable with fallback to a default value.
///
/// Logs a warning if the value exists but cannot be parsed.
fn parse_env_var_or_default<T, F>(env_var: &F, var_name: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Result<String, VarError>,
{
    match env_var(var_name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = var_name, value = %value, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

// ============================================================================
// Public Configuration Getters
// ============================================================================

/// Returns the cached rate limiting configuration.
///
/// Configuration is read from environment variables on first access:
/// - `RATE_LIMIT_REQUESTS`: Max requests per window (default: 100)
/// - `RATE_LIMIT_WINDOW_SECS`: Window duration in seconds (default: 60)
pub fn get_rate_limit_config() -> &'static RateLimitConfig {
    &RATE_LIMIT_CONFIG
}

/// Compute rate limiting configuration from environment variables
/// Invalid values fall back to defaults and log warnings
fn compute_rate_limit_config<F>(env_var: F) -> RateLimitConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let max_requests = parse_env_var_or_default(
        &env_var,
        env_vars::RATE_LIMIT_REQUESTS,
        defaults::RATE_LIMIT_REQUESTS,
    );

    let window_secs = parse_env_var_or_default(
        &env_var,
        env_vars::RATE_LIMIT_WINDOW_SECS,
        defaults::RATE_LIMIT_WINDOW_SECS,
    );

    let config = RateLimitConfig {
        max_requests,
        window_duration: Duration::from_secs(window_secs),
    };

    if !config.is_valid() {
        warn!("Invalid rate limit configuration, using defaults");
        return RateLimitConfig {
            max_requests: defaults::RATE_LIMIT_REQUESTS,
            window_duration: defaults::RATE_LIMIT_WINDOW,
        };
    }

    config
}

/// Returns the cached rate limiter cleanup configuration.
///
/// Configuration is read from environment variables on first access:
/// - `RATE_LIMIT_CLEANUP_THRESHOLD`: Entry count before cleanup (default: 10000, 0 = disabled)
/// - `RATE_LIMIT_CLEANUP_INTERVAL_SECS`: Minimum interval between cleanups (default: 60)
/// - `RATE_LIMIT_GRACE_SECS`: Time an entry outlives its window (default: 60)
///
/// # Example
///
/// ```
/// use framegate::config::get_rate_limit_cleanup_config;
///
/// let config = get_rate_limit_cleanup_config();
/// if config.is_enabled() {
///     println!("Cleanup triggers at {} entries", config.threshold);
/// }
/// ```
pub fn get_rate_limit_cleanup_config() -> &'static RateLimitCleanupConfig {
    &RATE_LIMIT_CLEANUP_CONFIG
}

fn compute_rate_limit_cleanup_config<F>(env_var: F) -> RateLimitCleanupConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let threshold = parse_env_var_or_default(
        &env_var,
        env_vars::RATE_LIMIT_CLEANUP_THRESHOLD,
        defaults::RATE_LIMIT_CLEANUP_THRESHOLD,
    );

    let interval_secs = parse_env_var_or_default(
        &env_var,
        env_vars::RATE_LIMIT_CLEANUP_INTERVAL_SECS,
        defaults::RATE_LIMIT_CLEANUP_INTERVAL_SECS,
    );

    let grace_secs = parse_env_var_or_default(
        &env_var,
        env_vars::RATE_LIMIT_GRACE_SECS,
        defaults::RATE_LIMIT_GRACE_SECS,
    );

    RateLimitCleanupConfig {
        threshold,
        interval: Duration::from_secs(interval_secs),
        grace: Duration::from_secs(grace_secs),
    }
}

/// Returns the cached proxy configuration.
///
/// Configuration is read from environment variables on first access:
/// - `PROXY_TIMEOUT_SECS`: Full fetch timeout (default: 30)
/// - `PROBE_TIMEOUT_SECS`: Probe timeout (default: 8)
/// - `MAX_REDIRECTS`: Redirect hops followed (default: 5)
/// - `MAX_BODY_SIZE_MB`: Maximum inbound body size (default: 50, 0 = unlimited)
/// - `MAX_RESPONSE_SIZE_MB`: Maximum upstream response size (default: 10, 0 = unlimited)
pub fn get_proxy_config() -> &'static ProxyConfig {
    &PROXY_CONFIG
}

fn compute_proxy_config<F>(env_var: F) -> ProxyConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let fetch_secs = parse_env_var_or_default(
        &env_var,
        env_vars::PROXY_TIMEOUT_SECS,
        defaults::FETCH_TIMEOUT_SECS,
    );
    let probe_secs = parse_env_var_or_default(
        &env_var,
        env_vars::PROBE_TIMEOUT_SECS,
        defaults::PROBE_TIMEOUT_SECS,
    );
    let max_redirects =
        parse_env_var_or_default(&env_var, env_vars::MAX_REDIRECTS, defaults::MAX_REDIRECTS);
    let max_body_mb = parse_env_var_or_default(
        &env_var,
        env_vars::MAX_BODY_SIZE_MB,
        defaults::MAX_BODY_SIZE_MB,
    );
    let max_response_mb = parse_env_var_or_default(
        &env_var,
        env_vars::MAX_RESPONSE_SIZE_MB,
        defaults::MAX_RESPONSE_SIZE_MB,
    );

    let config = ProxyConfig {
        fetch_timeout: Duration::from_secs(fetch_secs),
        probe_timeout: Duration::from_secs(probe_secs),
        max_redirects,
        max_body_size: ProxyConfig::mb_to_bytes(max_body_mb),
        max_response_size: ProxyConfig::mb_to_bytes(max_response_mb),
    };

    if !config.is_valid() {
        warn!("Invalid proxy configuration, using defaults");
        return ProxyConfig {
            fetch_timeout: defaults::FETCH_TIMEOUT,
            probe_timeout: defaults::PROBE_TIMEOUT,
            max_redirects,
            max_body_size: ProxyConfig::mb_to_bytes(max_body_mb),
            max_response_size: ProxyConfig::mb_to_bytes(max_response_mb),
        };
    }

    config
}

/// Returns `true` when `APP_ENV=development`.
pub fn get_expose_error_details() -> bool {
    *EXPOSE_ERROR_DETAILS
}

fn compute_expose_error_details<F>(env_var: F) -> bool
where
    F: Fn(&str) -> Result<String, VarError>,
{
    env_var(env_vars::APP_ENV)
        .map(|value| value.trim().eq_ignore_ascii_case(DEVELOPMENT_ENV))
        .unwrap_or(false)
}

// ============================================================================
// EnvVarConfig - ConfigProvider backed by environment variables
// ============================================================================

/// Configuration provider that reads from environment variables.
///
/// All values are cached process-wide on first access.
///
/// # Example
///
/// ```
/// use framegate::config::EnvVarConfig;
/// use framegate::RateLimitingProvider;
///
/// let config = EnvVarConfig::new();
/// println!("Max requests: {}", config.rate_limit_config().max_requests);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EnvVarConfig {
    _private: (),
}

impl EnvVarConfig {
    /// Creates a new configuration provider from environment variables.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl RateLimitingProvider for EnvVarConfig {
    fn rate_limit_config(&self) -> &RateLimitConfig {
        get_rate_limit_config()
    }

    fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig {
        get_rate_limit_cleanup_config()
    }
}

impl ProxyProvider for EnvVarConfig {
    fn proxy_config(&self) -> &ProxyConfig {
        get_proxy_config()
    }
}

impl DisclosureProvider for EnvVarConfig {
    fn expose_error_details(&self) -> bool {
        get_expose_error_details()
    }
}
