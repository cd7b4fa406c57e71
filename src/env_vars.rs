//! Environment variable names used throughout framegate configuration

/// Rate limiting configuration
pub const RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECS: &str = "RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_CLEANUP_THRESHOLD: &str = "RATE_LIMIT_CLEANUP_THRESHOLD";
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: &str = "RATE_LIMIT_CLEANUP_INTERVAL_SECS";
pub const RATE_LIMIT_GRACE_SECS: &str = "RATE_LIMIT_GRACE_SECS";

/// Upstream fetch configuration
pub const PROXY_TIMEOUT_SECS: &str = "PROXY_TIMEOUT_SECS";
pub const PROBE_TIMEOUT_SECS: &str = "PROBE_TIMEOUT_SECS";
pub const MAX_REDIRECTS: &str = "MAX_REDIRECTS";
pub const MAX_BODY_SIZE_MB: &str = "MAX_BODY_SIZE_MB";
pub const MAX_RESPONSE_SIZE_MB: &str = "MAX_RESPONSE_SIZE_MB";

/// Execution environment (`development` exposes internal error details)
pub const APP_ENV: &str = "APP_ENV";

/// Get all environment variable names for documentation/validation
pub fn all_env_vars() -> &'static [&'static str] {
    &[
        RATE_LIMIT_REQUESTS,
        RATE_LIMIT_WINDOW_SECS,
        RATE_LIMIT_CLEANUP_THRESHOLD,
        RATE_LIMIT_CLEANUP_INTERVAL_SECS,
        RATE_LIMIT_GRACE_SECS,
        PROXY_TIMEOUT_SECS,
        PROBE_TIMEOUT_SECS,
        MAX_REDIRECTS,
        MAX_BODY_SIZE_MB,
        MAX_RESPONSE_SIZE_MB,
        APP_ENV,
    ]
}
