//! Default configuration values for framegate.
//!
//! This module centralizes all default values used throughout framegate,
//! ensuring consistency between production code and tests.

use std::time::Duration;

/// Default maximum requests per rate limit window.
pub const RATE_LIMIT_REQUESTS: u32 = 100;

/// Default rate limit window duration in seconds.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default rate limit window duration.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(RATE_LIMIT_WINDOW_SECS);

/// Default cleanup threshold (number of entries before triggering cleanup).
pub const RATE_LIMIT_CLEANUP_THRESHOLD: usize = 10_000;

/// Default cleanup interval in seconds.
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default cleanup interval duration.
pub const RATE_LIMIT_CLEANUP_INTERVAL: Duration =
    Duration::from_secs(RATE_LIMIT_CLEANUP_INTERVAL_SECS);

/// Default grace period after a window resets before its entry counts as stale.
pub const RATE_LIMIT_GRACE_SECS: u64 = 60;

/// Default grace period duration.
pub const RATE_LIMIT_GRACE: Duration = Duration::from_secs(RATE_LIMIT_GRACE_SECS);

/// Default full-fetch timeout in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Default full-fetch timeout duration.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(FETCH_TIMEOUT_SECS);

/// Default probe timeout in seconds.
pub const PROBE_TIMEOUT_SECS: u64 = 8;

/// Default probe timeout duration.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(PROBE_TIMEOUT_SECS);

/// Default number of redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Default maximum inbound body size in megabytes.
pub const MAX_BODY_SIZE_MB: usize = 50;

/// Default maximum inbound body size in bytes.
pub const MAX_BODY_SIZE: usize = MAX_BODY_SIZE_MB * 1024 * 1024;

/// Default maximum upstream response body size in megabytes.
pub const MAX_RESPONSE_SIZE_MB: usize = 10;

/// Default maximum upstream response body size in bytes.
pub const MAX_RESPONSE_SIZE: usize = MAX_RESPONSE_SIZE_MB * 1024 * 1024;

/// Maximum length of a normalized target URL, in characters.
pub const MAX_URL_LENGTH: usize = 2048;

/// Widget script served for `widget_version=v1` (and anything unrecognised).
pub const WIDGET_FILE_V1: &str = "widget.js";

/// Widget script served for `widget_version=v2`.
pub const WIDGET_FILE_V2: &str = "widget-v2.js";

/// Browser-like user agent sent upstream to reduce bot blocking.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Accept header sent upstream.
pub const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Accept-Language header sent upstream.
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
