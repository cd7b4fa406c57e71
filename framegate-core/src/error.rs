//! Error types for framegate.
//!
//! [`ProxyError`] is the caller-facing failure taxonomy of the proxy
//! pipeline. Every variant knows its HTTP status, a stable machine code and
//! how to render itself as a JSON error body.

use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::url_validator::ValidationError;

/// Caller-facing error of a proxy request.
///
/// # Example
///
/// ```
/// use framegate_core::error::ProxyError;
/// use framegate_core::url_validator::ValidationError;
/// use hyper::StatusCode;
///
/// let err = ProxyError::from(ValidationError::PrivateAddress);
/// assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
/// assert_eq!(err.code(), "BLOCKED_URL");
/// assert_eq!(err.to_string(), "Private IP addresses are not allowed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// Target URL missing, malformed or disallowed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Only GET is served.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Declared request body exceeds the configured ceiling.
    #[error("Request body too large")]
    PayloadTooLarge {
        /// Declared size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        max: u64,
    },

    /// Client exceeded its request quota for the current window.
    #[error("Too many requests")]
    RateLimited {
        /// Whole seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Upstream did not answer within the fetch timeout.
    #[error("Request timeout")]
    Timeout,

    /// Upstream could not be reached at all.
    #[error("Unable to reach the website")]
    Unreachable(String),

    /// Upstream answered 404.
    #[error("Page not found")]
    NotFound,

    /// Upstream answered 403.
    #[error("Access to this page is forbidden")]
    Forbidden,

    /// Upstream answered with a server error.
    #[error("The website returned an error")]
    UpstreamError(u16),

    /// Any other fetch failure.
    #[error("Unable to access the website")]
    Inaccessible(String),

    /// Unexpected failure inside the proxy itself.
    #[error("Internal server error")]
    Internal(String),
}

impl ProxyError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(err) if err.is_security_block() => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Unreachable(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::Inaccessible(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable machine-readable code sent in the `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(err) if err.is_security_block() => "BLOCKED_URL",
            Self::Validation(_) => "INVALID_URL",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Timeout => "TIMEOUT",
            Self::Unreachable(_) => "UNREACHABLE",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::UpstreamError(_) => "UPSTREAM_ERROR",
            Self::Inaccessible(_) => "FETCH_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error should be logged at warn level or above.
    ///
    /// Rejected input and rate limiting are expected and only logged at
    /// debug level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Unreachable(_) | Self::UpstreamError(_) | Self::Internal(_)
        )
    }

    /// Builds the JSON error body.
    ///
    /// With `expose_details` unset, messages that may carry internal
    /// information are left out.
    pub fn to_body(&self, expose_details: bool) -> ErrorBody {
        let mut body = ErrorBody::new(self.to_string(), self.code());

        match self {
            Self::Validation(_) => {}
            Self::MethodNotAllowed => {
                body.details = Some("Only GET requests are supported".to_string());
            }
            Self::PayloadTooLarge { size, max } => {
                body.details = Some(format!("{size} bytes exceeds the {max} byte limit"));
            }
            Self::RateLimited { retry_after_secs } => {
                body.details = Some("Please wait before making more requests".to_string());
                body.retry_after = Some(*retry_after_secs);
            }
            Self::Timeout => {
                body.details = Some("The website took too long to respond".to_string());
                body.suggestion =
                    Some("Try again later or check that the URL is correct".to_string());
            }
            Self::Unreachable(reason) => {
                body.details = Some(reason.clone());
                body.suggestion =
                    Some("Check that the URL is correct and the website is online".to_string());
            }
            Self::NotFound => {
                body.details = Some("The website returned 404".to_string());
            }
            Self::Forbidden => {
                body.details = Some("The website refused access".to_string());
            }
            Self::UpstreamError(status) => {
                body.details = Some(format!("Upstream responded with status {status}"));
            }
            Self::Inaccessible(reason) | Self::Internal(reason) => {
                if expose_details {
                    body.details = Some(reason.clone());
                }
            }
        }

        body
    }
}

/// JSON body sent with every error response.
///
/// Serialises as `{error, details?, suggestion?, retryAfter?, code?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    fn new(error: String, code: &str) -> Self {
        Self {
            error,
            details: None,
            suggestion: None,
            retry_after: None,
            code: Some(code.to_string()),
        }
    }

    /// Serialises the body, falling back to a bare error object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string())
    }
}
