//! Framegate - a validating, rewriting page proxy
//!
//! Fetches third-party pages on a caller's behalf so they can be shown inside
//! a frame with a widget injected into them.
//!
//! # Overview
//!
//! Framegate provides:
//! - SSRF-oriented URL validation, re-applied on every redirect hop
//! - Per-client fixed-window rate limiting
//! - Lightweight HTML rewriting and widget injection
//! - Classification of upstream failures into JSON errors
//! - Structured logging with JSON support
//!
//! # Example
//!
//! ```rust,no_run
//! use framegate::{config, RateLimiter};
//!
//! // Get configuration from environment
//! let rate_config = config::get_rate_limit_config();
//! let proxy_config = config::get_proxy_config();
//!
//! // Create a rate limiter
//! let limiter = RateLimiter::new();
//! ```
//!
//! # Modules
//!
//! - [`config`] - Configuration management from environment variables
//! - [`env_vars`] - Environment variable constants
//! - [`server`] - Logging setup, startup banner and accept loop
//! - [`args`] - Command line argument parsing
//!
//! # Re-exports from framegate-core
//!
//! Core functionality is provided by the `framegate-core` crate:
//! - [`url_validator`] - URL normalization and SSRF checks
//! - [`rate_limiter`] - Rate limiting implementation
//! - [`request_handler`] - The proxy pipeline

#![forbid(unsafe_code)]

pub mod args;
pub mod config;
pub mod env_vars;
pub mod server;

// Re-export framegate-core modules
pub use framegate_core::fetch;
pub use framegate_core::rate_limiter;
pub use framegate_core::request_handler;
pub use framegate_core::types;
pub use framegate_core::url_validator;

// Re-export commonly used items at crate root
pub use config::{
    EnvVarConfig, get_expose_error_details, get_proxy_config, get_rate_limit_cleanup_config,
    get_rate_limit_config,
};
pub use framegate_core::{
    // Aggregated configuration trait
    ConfigProvider,
    // Composable configuration traits
    DisclosureProvider,
    // Pipeline
    Fetcher,
    // Configuration structs
    ProxyConfig,
    ProxyError,
    ProxyProvider,
    ProxyServices,
    RateLimitCleanupConfig,
    RateLimitConfig,
    // Rate limiting types
    RateLimitEntry,
    RateLimiter,
    RateLimitingProvider,
    ReqwestFetcher,
};
