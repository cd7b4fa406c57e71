//! Client identification for rate limiting.
//!
//! Derives a stable key for the caller from proxy headers, falling back to
//! the TCP peer address.
//!
//! # Resolution order
//!
//! 1. First valid IP in `X-Forwarded-For` (the originating client)
//! 2. `for=` node of the first element of an RFC 7239 `Forwarded` header
//! 3. The connection's peer IP
//! 4. The literal `"unknown"`
//!
//! The headers are taken at face value. Deployments that are reachable
//! without a fronting proxy let clients pick their own key.

use std::net::{IpAddr, SocketAddr};

use hyper::HeaderMap;

use crate::headers;

/// Key used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Returns the rate-limit key for a request.
///
/// # Example
///
/// ```
/// use framegate_core::client_id::extract_client_id;
/// use hyper::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
///
/// assert_eq!(extract_client_id(&headers, None), "203.0.113.7");
/// assert_eq!(extract_client_id(&HeaderMap::new(), None), "unknown");
/// ```
pub fn extract_client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = headers
        .get(headers::X_FORWARDED_FOR)
        .and_then(|h| h.to_str().ok())
        .and_then(client_ip_from_xff)
    {
        return ip;
    }

    if let Some(ip) = headers
        .get(headers::FORWARDED)
        .and_then(|h| h.to_str().ok())
        .and_then(client_ip_from_forwarded)
    {
        return ip;
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// First valid IP in an `X-Forwarded-For` chain.
fn client_ip_from_xff(xff: &str) -> Option<String> {
    xff.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .find_map(parse_ip)
}

/// `for=` value of the first `Forwarded` element.
///
/// Elements are separated by ',' and parameters within an element by ';'.
fn client_ip_from_forwarded(forwarded: &str) -> Option<String> {
    forwarded
        .split(',')
        .next()
        .and_then(|element| {
            element.split(';').find_map(|param| {
                let (key, value) = param.trim().split_once('=')?;
                key.eq_ignore_ascii_case("for").then_some(value)
            })
        })
        .and_then(ip_from_node_identifier)
}

/// Extracts the address from an RFC 7239 node identifier.
///
/// Handles `IP`, `IP:port`, `[IPv6]`, `[IPv6]:port` and quoted forms;
/// obfuscated (`_x`) and `unknown` nodes yield `None`.
fn ip_from_node_identifier(value: &str) -> Option<String> {
    let value = value.trim().trim_matches('"');

    if value.eq_ignore_ascii_case("unknown") || value.starts_with('_') {
        return None;
    }

    if let Some(rest) = value.strip_prefix('[') {
        let (ipv6, _) = rest.split_once(']')?;
        return parse_ip(ipv6);
    }

    // A single colon means IPv4 with a port
    if value.matches(':').count() == 1 {
        let (ip, _) = value.split_once(':')?;
        return parse_ip(ip);
    }

    parse_ip(value)
}

fn parse_ip(candidate: &str) -> Option<String> {
    candidate
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
        .map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn peer() -> Option<SocketAddr> {
        Some("198.51.100.20:54321".parse().unwrap())
    }

    // ===========================================
    // X-Forwarded-For
    // ===========================================

    #[test]
    fn test_xff_single_ip() {
        let headers = headers_with("x-forwarded-for", "203.0.113.7");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_xff_takes_first_ip() {
        let headers = headers_with("x-forwarded-for", "203.0.113.7, 10.0.0.1, 10.0.0.2");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_xff_skips_garbage_entries() {
        let headers = headers_with("x-forwarded-for", "not-an-ip, , 203.0.113.9");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn test_xff_ipv6() {
        let headers = headers_with("x-forwarded-for", "2001:db8::1");
        assert_eq!(extract_client_id(&headers, peer()), "2001:db8::1");
    }

    #[test]
    fn test_xff_all_invalid_falls_back_to_peer() {
        let headers = headers_with("x-forwarded-for", "garbage, more-garbage");
        assert_eq!(extract_client_id(&headers, peer()), "198.51.100.20");
    }

    // ===========================================
    // Forwarded (RFC 7239)
    // ===========================================

    #[test]
    fn test_forwarded_for_ipv4() {
        let headers = headers_with("forwarded", "for=203.0.113.7;proto=https;by=10.0.0.1");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_with_port() {
        let headers = headers_with("forwarded", "for=203.0.113.7:4711");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_quoted_ipv6_with_port() {
        let headers = headers_with("forwarded", r#"for="[2001:db8:cafe::17]:4711""#);
        assert_eq!(extract_client_id(&headers, peer()), "2001:db8:cafe::17");
    }

    #[test]
    fn test_forwarded_uses_first_element() {
        let headers = headers_with("forwarded", "for=203.0.113.7, for=198.51.100.1");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_case_insensitive_key() {
        let headers = headers_with("forwarded", "For=203.0.113.7");
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_obfuscated_falls_back_to_peer() {
        let headers = headers_with("forwarded", "for=_hidden");
        assert_eq!(extract_client_id(&headers, peer()), "198.51.100.20");

        let headers = headers_with("forwarded", "for=unknown");
        assert_eq!(extract_client_id(&headers, peer()), "198.51.100.20");
    }

    #[test]
    fn test_xff_preferred_over_forwarded() {
        let mut headers = headers_with("x-forwarded-for", "203.0.113.7");
        headers.insert("forwarded", HeaderValue::from_static("for=198.51.100.1"));
        assert_eq!(extract_client_id(&headers, peer()), "203.0.113.7");
    }

    // ===========================================
    // Fallbacks
    // ===========================================

    #[test]
    fn test_no_headers_uses_peer() {
        assert_eq!(extract_client_id(&HeaderMap::new(), peer()), "198.51.100.20");
    }

    #[test]
    fn test_no_headers_no_peer_is_unknown() {
        assert_eq!(extract_client_id(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }
}
