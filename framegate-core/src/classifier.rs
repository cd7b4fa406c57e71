//! Maps fetch failures onto the caller-facing error taxonomy.

use crate::error::ProxyError;
use crate::fetch::FetchError;

/// Classifies a transport failure.
///
/// | Failure | Result | Status |
/// |---|---|---|
/// | timeout | [`ProxyError::Timeout`] | 408 |
/// | refused, no response, redirect trouble | [`ProxyError::Unreachable`] | 502 |
/// | upstream 404 | [`ProxyError::NotFound`] | 404 |
/// | upstream 403 | [`ProxyError::Forbidden`] | 403 |
/// | upstream 5xx | [`ProxyError::UpstreamError`] | 502 |
/// | oversized page | [`ProxyError::Inaccessible`] | 400 |
/// | anything else | [`ProxyError::Inaccessible`] | 400 |
///
/// # Example
///
/// ```
/// use framegate_core::classifier::classify;
/// use framegate_core::fetch::FetchError;
/// use hyper::StatusCode;
///
/// assert_eq!(classify(&FetchError::Timeout).status_code(), StatusCode::REQUEST_TIMEOUT);
/// assert_eq!(classify(&FetchError::HttpStatus(503)).status_code(), StatusCode::BAD_GATEWAY);
/// ```
pub fn classify(error: &FetchError) -> ProxyError {
    match error {
        FetchError::Timeout => ProxyError::Timeout,
        FetchError::ConnectionRefused => {
            ProxyError::Unreachable("The website refused the connection".to_string())
        }
        FetchError::NoResponse => {
            ProxyError::Unreachable("The website did not respond".to_string())
        }
        FetchError::TooManyRedirects => {
            ProxyError::Unreachable("The website redirected too many times".to_string())
        }
        FetchError::RedirectBlocked(_) => {
            ProxyError::Unreachable("The website redirected to a disallowed address".to_string())
        }
        FetchError::HttpStatus(404) => ProxyError::NotFound,
        FetchError::HttpStatus(403) => ProxyError::Forbidden,
        FetchError::HttpStatus(status) if *status >= 500 => ProxyError::UpstreamError(*status),
        FetchError::HttpStatus(status) => {
            ProxyError::Inaccessible(format!("Upstream responded with status {status}"))
        }
        FetchError::BodyTooLarge { limit } => {
            ProxyError::Inaccessible(format!("Page is larger than {limit} bytes"))
        }
        FetchError::Other(message) => ProxyError::Inaccessible(message.clone()),
    }
}
