//! Rate limiting implementation for framegate.
//!
//! Provides per-client rate limiting using a fixed-window counter with
//! access-triggered eviction of stale entries.
//!
//! # Algorithm
//!
//! Each client has a counter and the instant its current window ends:
//! - On first sight, an entry is created with `count = 0` and a fresh window
//! - If the window has ended, the counter resets to 0 and a new window starts
//! - The counter is incremented on every call
//! - A call is denied once the counter exceeds the limit
//!
//! Because windows are fixed rather than sliding, a client can burst up to
//! twice the limit across a window boundary.
//!
//! # Memory Management
//!
//! Entries for clients that stopped sending requests are removed when:
//! - Entry count exceeds the configured threshold
//! - Minimum interval since last cleanup has passed
//!
//! # Example
//!
//! ```ignore
//! use framegate_core::{rate_limiter, RateLimiter};
//!
//! let limiter = RateLimiter::new();
//!
//! let decision = rate_limiter::admit(&limiter, "203.0.113.7", &config).await;
//! if !decision.allowed {
//!     // answer 429 with decision.retry_after_secs
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::types::{
    ConfigProvider, RateLimitCleanupConfig, RateLimitDecision, RateLimitEntry, RateLimiter,
};

/// Counts a request from `client_id` and decides whether it may proceed.
///
/// # Arguments
///
/// * `limiter` - Shared rate limiter state
/// * `client_id` - Key identifying the caller (usually its IP address)
/// * `config` - Configuration provider for rate limit settings
///
/// # Returns
///
/// A [`RateLimitDecision`]; when denied, `retry_after_secs` is the number of
/// whole seconds (rounded up) until the client's window resets.
pub async fn admit(
    limiter: &RateLimiter,
    client_id: &str,
    config: &impl ConfigProvider,
) -> RateLimitDecision {
    let rate_config = config.rate_limit_config();
    let mut rate_map = limiter.inner().lock().await;
    let now = Instant::now();

    evict_stale_entries(limiter, &mut rate_map, now, config.rate_limit_cleanup_config()).await;

    let entry = rate_map
        .entry(client_id.to_string())
        .or_insert_with(|| RateLimitEntry::new(now, rate_config.window_duration));

    if now > entry.window_reset_at {
        entry.count = 0;
        entry.window_reset_at = now + rate_config.window_duration;
    }

    entry.count = entry.count.saturating_add(1);

    if entry.count > rate_config.max_requests {
        let retry_after_secs = ceil_secs(entry.window_reset_at.saturating_duration_since(now));
        debug!(
            client = client_id,
            count = entry.count,
            retry_after_secs,
            "Rate limit exceeded"
        );
        RateLimitDecision::deny(retry_after_secs)
    } else {
        RateLimitDecision::allow()
    }
}

/// Removes stale entries once the table is large enough and the previous
/// sweep is old enough. Runs with the table lock already held.
async fn evict_stale_entries(
    limiter: &RateLimiter,
    rate_map: &mut HashMap<String, RateLimitEntry>,
    now: Instant,
    cleanup_config: &RateLimitCleanupConfig,
) {
    if !cleanup_config.is_enabled() || rate_map.len() <= cleanup_config.threshold {
        return;
    }

    let should_cleanup = {
        let mut last_cleanup = limiter.last_cleanup().lock().await;
        match *last_cleanup {
            Some(last) if now.duration_since(last) < cleanup_config.interval => false,
            _ => {
                *last_cleanup = Some(now);
                true
            }
        }
    };

    if !should_cleanup {
        return;
    }

    let before_count = rate_map.len();
    rate_map.retain(|_, entry| !entry.is_stale(now, cleanup_config.grace));
    let removed = before_count - rate_map.len();
    if removed > 0 {
        debug!(
            removed_entries = removed,
            remaining_entries = rate_map.len(),
            "Rate limiter cleanup completed"
        );
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    u64::try_from(millis.div_ceil(1000)).unwrap_or(u64::MAX)
}
