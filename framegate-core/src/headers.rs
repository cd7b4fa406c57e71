//! HTTP header constants for framegate.
//!
//! This module centralizes all HTTP header names used throughout the codebase,
//! avoiding magic strings and ensuring consistency.

/// X-Forwarded-For header - contains the originating client IP.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// X-Forwarded-Proto header - scheme the client used to reach us.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Forwarded header (RFC 7239) - standardized proxy header.
pub const FORWARDED: &str = "forwarded";

/// X-Proxied-URL header - names the upstream page a response came from.
pub const X_PROXIED_URL: &str = "x-proxied-url";

/// Content-Type header.
pub const CONTENT_TYPE: &str = "content-type";

/// Host header.
pub const HOST: &str = "host";

/// Content-Length header.
pub const CONTENT_LENGTH: &str = "content-length";

/// Allow header (for 405 responses).
pub const ALLOW: &str = "allow";

/// Retry-After header (for 429 responses).
pub const RETRY_AFTER: &str = "retry-after";

/// X-Frame-Options header, stripped so pages can be embedded.
pub const X_FRAME_OPTIONS: &str = "x-frame-options";

/// Content-Security-Policy header, stripped so pages can be embedded.
pub const CONTENT_SECURITY_POLICY: &str = "content-security-policy";

/// Report-only CSP header, stripped along with the enforcing one.
pub const CONTENT_SECURITY_POLICY_REPORT_ONLY: &str = "content-security-policy-report-only";

/// CORS allowed origin.
pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "access-control-allow-origin";

/// CORS allowed methods.
pub const ACCESS_CONTROL_ALLOW_METHODS: &str = "access-control-allow-methods";

/// CORS allowed request headers.
pub const ACCESS_CONTROL_ALLOW_HEADERS: &str = "access-control-allow-headers";

/// Connection header (hop-by-hop).
pub const CONNECTION: &str = "connection";

/// Keep-Alive header (hop-by-hop).
pub const KEEP_ALIVE: &str = "keep-alive";

/// Proxy-Authenticate header (hop-by-hop).
pub const PROXY_AUTHENTICATE: &str = "proxy-authenticate";

/// Proxy-Authorization header (hop-by-hop).
pub const PROXY_AUTHORIZATION: &str = "proxy-authorization";

/// TE header (hop-by-hop).
pub const TE: &str = "te";

/// Trailers header (hop-by-hop).
pub const TRAILERS: &str = "trailers";

/// Transfer-Encoding header (hop-by-hop).
pub const TRANSFER_ENCODING: &str = "transfer-encoding";

/// Upgrade header (hop-by-hop).
pub const UPGRADE: &str = "upgrade";

/// CORS values attached to every response.
pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str =
    "Origin, X-Requested-With, Content-Type, Accept, Authorization";

/// List of all hop-by-hop headers that should not be forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILERS,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Upstream headers that would stop the page from being framed.
pub const FRAME_BLOCKING_HEADERS: &[&str] = &[
    X_FRAME_OPTIONS,
    CONTENT_SECURITY_POLICY,
    CONTENT_SECURITY_POLICY_REPORT_ONLY,
];

/// Check if a header is a hop-by-hop header that shouldn't be forwarded.
///
/// # Example
///
/// ```
/// use framegate_core::headers::is_hop_by_hop;
///
/// assert!(is_hop_by_hop("connection"));
/// assert!(is_hop_by_hop("transfer-encoding"));
/// assert!(!is_hop_by_hop("content-type"));
/// ```
pub fn is_hop_by_hop(header_name: &str) -> bool {
    HOP_BY_HOP_HEADERS.contains(&header_name)
}

/// Returns `true` if an upstream response header must not reach the caller.
///
/// Covers hop-by-hop headers, frame-blocking headers, and `content-length`
/// (the body is rewritten, so the upstream length is wrong).
///
/// # Example
///
/// ```
/// use framegate_core::headers::is_stripped_upstream_header;
///
/// assert!(is_stripped_upstream_header("x-frame-options"));
/// assert!(is_stripped_upstream_header("Content-Security-Policy"));
/// assert!(!is_stripped_upstream_header("cache-control"));
/// ```
pub fn is_stripped_upstream_header(header_name: &str) -> bool {
    let lower = header_name.to_ascii_lowercase();
    is_hop_by_hop(&lower)
        || FRAME_BLOCKING_HEADERS.contains(&lower.as_str())
        || lower == CONTENT_LENGTH
}
