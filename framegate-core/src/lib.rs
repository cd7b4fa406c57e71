//! Framegate Core - validating, rewriting page proxy components
//!
//! This crate provides the core functionality of a proxy that fetches
//! third-party pages on a caller's behalf and embeds a widget into them:
//! - SSRF-oriented URL validation
//! - Fixed-window rate limiting per client
//! - Pluggable outbound fetching with redirect re-validation
//! - Classification of fetch failures into HTTP errors
//! - Best-effort HTML rewriting and widget injection
//!
//! # Overview
//!
//! `framegate-core` never reads the environment. Configuration is provided
//! via the [`ConfigProvider`] trait, the outbound transport via the
//! [`Fetcher`] trait, and the HTML transform via [`DocumentRewriter`].
//!
//! # Example
//!
//! ```rust,no_run
//! use framegate_core::{
//!     DisclosureProvider, ProxyConfig, ProxyProvider, ProxyServices, RateLimitCleanupConfig,
//!     RateLimitConfig, RateLimiter, RateLimitingProvider, ReqwestFetcher,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct MyConfig;
//!
//! impl RateLimitingProvider for MyConfig {
//!     fn rate_limit_config(&self) -> &RateLimitConfig {
//!         static CONFIG: RateLimitConfig = RateLimitConfig {
//!             max_requests: 100,
//!             window_duration: Duration::from_secs(60),
//!         };
//!         &CONFIG
//!     }
//!
//!     fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig {
//!         static CONFIG: RateLimitCleanupConfig = RateLimitCleanupConfig {
//!             threshold: 10_000,
//!             interval: Duration::from_secs(60),
//!             grace: Duration::from_secs(60),
//!         };
//!         &CONFIG
//!     }
//! }
//!
//! impl ProxyProvider for MyConfig {
//!     fn proxy_config(&self) -> &ProxyConfig {
//!         static CONFIG: ProxyConfig = ProxyConfig {
//!             fetch_timeout: Duration::from_secs(30),
//!             probe_timeout: Duration::from_secs(8),
//!             max_redirects: 5,
//!             max_body_size: 50 * 1024 * 1024,
//!             max_response_size: 10 * 1024 * 1024,
//!         };
//!         &CONFIG
//!     }
//! }
//!
//! impl DisclosureProvider for MyConfig {
//!     fn expose_error_details(&self) -> bool { false }
//! }
//!
//! let fetcher = ReqwestFetcher::new(5).expect("HTTP client");
//! let services = ProxyServices::new(RateLimiter::new(), Arc::new(fetcher));
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration traits, config structs and rate limiter state
//! - [`url_validator`] - URL normalization and SSRF checks
//! - [`rate_limiter`] - Fixed-window admission control
//! - [`client_id`] - Client key extraction from proxy headers
//! - [`fetch`] - Outbound fetch trait and implementations
//! - [`classifier`] - Fetch failure classification
//! - [`rewrite`] - HTML rewriting and widget injection
//! - [`request_handler`] - The end-to-end proxy pipeline
//! - [`error`] - Caller-facing error type
//! - [`headers`] - HTTP header constants
//! - [`defaults`] - Default configuration values

#![forbid(unsafe_code)]

pub mod classifier;
pub mod client_id;
pub mod defaults;
pub mod error;
pub mod fetch;
pub mod headers;
pub mod rate_limiter;
pub mod request_handler;
pub mod rewrite;
#[cfg(test)]
pub mod test_utils;
pub mod types;
pub mod url_validator;

// Re-export commonly used items at crate root
pub use error::{ErrorBody, ProxyError};
pub use fetch::{FetchError, FetchMode, FetchRequest, FetchResponse, Fetcher, ReqwestFetcher};
pub use request_handler::{ProxyRequest, ProxyServices};
pub use rewrite::{DocumentRewriter, SubstringRewriter, WidgetVersion};
pub use types::{
    // Aggregated configuration trait
    ConfigProvider,
    // Composable configuration traits
    DisclosureProvider,
    // Configuration structs
    ProxyConfig,
    ProxyProvider,
    RateLimitCleanupConfig,
    RateLimitConfig,
    // Rate limiting types
    RateLimitDecision,
    RateLimitEntry,
    RateLimiter,
    RateLimitingProvider,
};
pub use url_validator::{ValidatedUrl, ValidationError, ValidationResult};
