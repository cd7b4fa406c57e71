//! Target URL validation for framegate.
//!
//! Every page the proxy fetches passes through [`validate`] first. It is the
//! only barrier between callers and the internal network, so checks run in a
//! fixed order and stop at the first failure:
//!
//! 1. Reject absent or blank input
//! 2. Prepend `https://` when no scheme is given
//! 3. Reject normalized URLs longer than [`MAX_URL_LENGTH`] characters
//! 4. Parse; reject non-HTTP(S) schemes and empty hosts
//! 5. Reject local hosts (`localhost`, loopback and unspecified literals)
//! 6. Reject private and link-local address ranges
//! 7. Reject port 0 and well-known service ports
//! 8. Reject URLs carrying script-injection patterns
//!
//! The URL is parsed exactly once; the resulting [`ValidatedUrl`] carries both
//! the normalized string and the parsed components for later stages.
//!
//! # Example
//!
//! ```
//! use framegate_core::url_validator::{validate, ValidationError};
//!
//! let target = validate(Some("example.com")).unwrap();
//! assert_eq!(target.normalized(), "https://example.com");
//!
//! assert_eq!(
//!     validate(Some("http://192.168.1.1")).unwrap_err(),
//!     ValidationError::PrivateAddress
//! );
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::defaults::MAX_URL_LENGTH;

/// Hostnames that always refer to this machine.
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1", "[::1]"];

/// Ports of remote-administration and mail services that are never proxied.
const BLOCKED_PORTS: &[u16] = &[22, 23, 25, 110, 135, 139, 445, 3389];

/// Substrings that mark a URL as an injection attempt (matched case-insensitively).
const SUSPICIOUS_PATTERNS: &[&str] = &[
    "javascript:",
    "data:text/html",
    "vbscript:",
    "onmouseover=",
    "onclick=",
    "<script",
    "base64,",
];

/// Hostname prefixes of private and reserved ranges, applied to the
/// lower-cased host with IPv6 brackets removed.
static PRIVATE_HOST_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^10\.",                    // RFC1918 class A
        r"^172\.(1[6-9]|2\d|3[01])\.", // RFC1918 class B
        r"^192\.168\.",              // RFC1918 class C
        r"^169\.254\.",              // link-local
        r"^fc00:",                   // unique local
        r"^fd[0-9a-f]{2}:",          // unique local
        r"^fe80:",                   // link-local
        r"^::1$",                    // loopback
        r"^::",                      // unspecified / compressed prefix
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("private host pattern is a valid regex"))
    .collect()
});

static EXPLICIT_SCHEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.\-]*)://").expect("scheme pattern is a valid regex")
});

static EVENT_HANDLER_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)on\w+=").expect("event handler pattern is a valid regex"));

static JAVASCRIPT_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript:").expect("javascript pattern is a valid regex"));

/// Reasons a target URL is refused.
///
/// The `Display` text of each variant is the message shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    Missing,

    #[error("URL is too long")]
    TooLong,

    #[error("Only HTTP and HTTPS protocols are supported")]
    UnsupportedScheme,

    #[error("Please enter a valid URL format")]
    Malformed,

    #[error("Local addresses are not allowed")]
    LocalAddress,

    #[error("Private IP addresses are not allowed")]
    PrivateAddress,

    #[error("Invalid port number")]
    InvalidPort,

    #[error("This port is not allowed")]
    BlockedPort,

    #[error("URL contains suspicious patterns")]
    SuspiciousPattern,
}

impl ValidationError {
    /// Returns `true` when the URL was well-formed but points somewhere the
    /// proxy refuses to go (answered with 403 rather than 400).
    pub fn is_security_block(&self) -> bool {
        matches!(
            self,
            Self::LocalAddress | Self::PrivateAddress | Self::BlockedPort | Self::SuspiciousPattern
        )
    }
}

/// A target URL that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    normalized: String,
    parsed: Url,
}

impl ValidatedUrl {
    /// The trimmed input with a scheme guaranteed (`http://` or `https://`).
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The parsed form, used for fetching.
    pub fn url(&self) -> &Url {
        &self.parsed
    }

    /// `http` or `https`.
    pub fn scheme(&self) -> &str {
        self.parsed.scheme()
    }

    /// Lower-cased hostname (IPv6 literals keep their brackets).
    pub fn host(&self) -> &str {
        self.parsed.host_str().unwrap_or_default()
    }

    /// Explicit non-default port, if any.
    pub fn port(&self) -> Option<u16> {
        self.parsed.port()
    }

    /// `scheme://host[:port]`, without a trailing slash.
    pub fn origin(&self) -> String {
        self.parsed.origin().ascii_serialization()
    }
}

/// Serializable outcome of a validation, shaped for API responses.
///
/// `is_valid == true` always comes with a `normalized_url`; `false` always
/// comes with an `error` and no URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub normalized_url: Option<String>,
    pub error: Option<String>,
}

impl From<&Result<ValidatedUrl, ValidationError>> for ValidationResult {
    fn from(result: &Result<ValidatedUrl, ValidationError>) -> Self {
        match result {
            Ok(validated) => Self {
                is_valid: true,
                normalized_url: Some(validated.normalized().to_string()),
                error: None,
            },
            Err(err) => Self {
                is_valid: false,
                normalized_url: None,
                error: Some(err.to_string()),
            },
        }
    }
}

impl From<Result<ValidatedUrl, ValidationError>> for ValidationResult {
    fn from(result: Result<ValidatedUrl, ValidationError>) -> Self {
        Self::from(&result)
    }
}

/// Validates and normalizes a candidate target URL.
///
/// Pure and deterministic; safe to call from any number of tasks at once.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered, in the order listed in
/// the module documentation.
pub fn validate(input: Option<&str>) -> Result<ValidatedUrl, ValidationError> {
    let trimmed = input.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing);
    }

    let normalized = normalize(trimmed)?;

    if normalized.chars().count() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong);
    }

    let parsed = Url::parse(&normalized).map_err(|_| ValidationError::Malformed)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::UnsupportedScheme);
    }

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return Err(ValidationError::Malformed),
    };

    if is_local_host(&host) {
        return Err(ValidationError::LocalAddress);
    }

    if is_private_host(&host) {
        return Err(ValidationError::PrivateAddress);
    }

    if let Some(port) = parsed.port() {
        if port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if BLOCKED_PORTS.contains(&port) {
            return Err(ValidationError::BlockedPort);
        }
    }

    if has_suspicious_pattern(&normalized) {
        return Err(ValidationError::SuspiciousPattern);
    }

    Ok(ValidatedUrl { normalized, parsed })
}

/// Strips markup and script fragments from a URL before echoing it into a
/// response body. Not a security check; [`validate`] makes that decision.
///
/// # Example
///
/// ```
/// use framegate_core::url_validator::sanitize_for_display;
///
/// assert_eq!(
///     sanitize_for_display("https://x.com/<b>?onload=javascript:go"),
///     "https://x.com/b?go"
/// );
/// ```
pub fn sanitize_for_display(url: &str) -> String {
    let without_brackets: String = url.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let without_scheme = JAVASCRIPT_SCHEME.replace_all(&without_brackets, "");
    EVENT_HANDLER_ATTR.replace_all(&without_scheme, "").into_owned()
}

/// Returns the hostname of `url`, or an empty string if it does not parse.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Ensures the input carries a scheme, biased towards HTTPS.
fn normalize(trimmed: &str) -> Result<String, ValidationError> {
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(trimmed.to_string());
    }

    // An explicit foreign scheme must not be smuggled in as a hostname
    if EXPLICIT_SCHEME.is_match(trimmed) {
        return Err(ValidationError::UnsupportedScheme);
    }

    Ok(format!("https://{trimmed}"))
}

fn is_local_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    if LOCAL_HOSTS.contains(&host) {
        return true;
    }

    match parse_ip_literal(host) {
        Some(ip) => ip.is_loopback() || ip.is_unspecified(),
        None => false,
    }
}

fn is_private_host(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if PRIVATE_HOST_PATTERNS.iter().any(|pattern| pattern.is_match(bare)) {
        return true;
    }

    match parse_ip_literal(host) {
        Some(IpAddr::V4(ip)) => is_private_ipv4(ip),
        Some(IpAddr::V6(ip)) => is_private_ipv6(ip),
        None => false,
    }
}

fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_link_local()
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_ipv4(mapped) || mapped.is_loopback();
    }
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link-local
    (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

fn has_suspicious_pattern(normalized: &str) -> bool {
    let lower = normalized.to_lowercase();
    SUSPICIOUS_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
