//! Outbound fetching of target pages.
//!
//! The proxy pipeline talks to upstream sites through the [`Fetcher`] trait,
//! so the transport can be swapped (or faked in tests) without touching
//! validation, classification or rewriting. Transport failures surface as
//! the tagged [`FetchError`]; nothing downstream sees client-library types.
//!
//! [`ReqwestFetcher`] is the production implementation. It follows at most
//! `max_redirects` hops and re-validates every redirect target, so a public
//! page cannot bounce the proxy into a private network.

use std::error::Error as StdError;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use hyper::HeaderMap;
use hyper::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderName, HeaderValue, USER_AGENT};
use thiserror::Error;
use tracing::debug;

use crate::defaults;
use crate::url_validator::{self, ValidationError};

/// Whether a fetch should retrieve the page or only check that it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Existence check; no body is retrieved.
    Probe,
    /// Full page retrieval.
    Full,
}

/// One outbound fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute, already validated target URL
    pub url: String,
    pub mode: FetchMode,
    /// Hard deadline for the whole exchange, body included
    pub timeout: Duration,
    /// Largest body accepted, in bytes (0 = unlimited)
    pub max_response_size: usize,
}

/// Upstream answer with a status below 500.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Empty for probes
    pub body: Bytes,
}

impl FetchResponse {
    /// Returns the upstream `content-type`, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns `true` if the upstream declared an HTML document.
    pub fn is_html(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }

    /// Returns `true` if the body still carries a content coding.
    ///
    /// The reqwest client decodes gzip, brotli and deflate itself, so this
    /// only holds for codings it does not know.
    pub fn is_encoded(&self) -> bool {
        self.headers
            .get(hyper::header::CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|coding| !coding.trim().eq_ignore_ascii_case("identity"))
    }
}

/// Transport-level failure of a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("upstream timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("no response from upstream")]
    NoResponse,

    /// Upstream answered with a status the pipeline does not accept.
    #[error("upstream responded with status {0}")]
    HttpStatus(u16),

    #[error("too many redirects")]
    TooManyRedirects,

    /// The upstream body outgrew the configured ceiling.
    #[error("upstream response exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// A redirect pointed at a target the validator rejects.
    #[error("redirect blocked: {0}")]
    RedirectBlocked(ValidationError),

    #[error("{0}")]
    Other(String),
}

/// Performs outbound fetches.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

// ============================================================================
// reqwest implementation
// ============================================================================

/// Reason the redirect policy stopped following a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
enum RedirectRefused {
    #[error("too many redirects")]
    TooMany,
    #[error("redirect target rejected: {0}")]
    Blocked(ValidationError),
}

/// Decides whether to follow a redirect to `next`.
///
/// `previous_hops` counts the URLs already visited in the chain, the
/// original request included.
fn redirect_verdict(
    next: &str,
    previous_hops: usize,
    max_redirects: usize,
) -> Result<(), RedirectRefused> {
    if previous_hops > max_redirects {
        return Err(RedirectRefused::TooMany);
    }
    url_validator::validate(Some(next))
        .map(|_| ())
        .map_err(RedirectRefused::Blocked)
}

/// [`Fetcher`] backed by a pooled [`reqwest::Client`].
///
/// Sends browser-like request headers to reduce bot blocking. Compressed
/// bodies are decoded by the client (the `content-encoding` header goes with
/// them), so HTML arrives ready to be rewritten.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds the shared client. Called once at startup.
    pub fn new(max_redirects: usize) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(defaults::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(defaults::ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(defaults::ACCEPT_LANGUAGE),
        );

        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            match redirect_verdict(attempt.url().as_str(), attempt.previous().len(), max_redirects)
            {
                Ok(()) => attempt.follow(),
                Err(refused) => attempt.error(refused),
            }
        });

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(policy)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let builder = match request.mode {
            FetchMode::Probe => self.client.head(&request.url),
            FetchMode::Full => self.client.get(&request.url),
        };

        let response = builder.timeout(request.timeout).send().await?;
        let status = response.status().as_u16();
        if status >= 500 {
            return Err(FetchError::HttpStatus(status));
        }

        if response.url().as_str() != request.url {
            debug!(from = %request.url, to = %response.url(), "Followed redirects");
        }

        let headers = response.headers().clone();
        let body = match request.mode {
            FetchMode::Probe => Bytes::new(),
            FetchMode::Full => read_capped(response, request.max_response_size).await?,
        };

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        if err.is_redirect() {
            return match find_source::<RedirectRefused>(&err) {
                Some(RedirectRefused::Blocked(reason)) => Self::RedirectBlocked(*reason),
                _ => Self::TooManyRedirects,
            };
        }

        if err.is_connect() {
            let refused = find_source::<std::io::Error>(&err)
                .is_some_and(|io| io.kind() == std::io::ErrorKind::ConnectionRefused);
            return if refused {
                Self::ConnectionRefused
            } else {
                Self::NoResponse
            };
        }

        if err.is_request() || err.is_body() {
            return Self::NoResponse;
        }

        Self::Other(err.to_string())
    }
}

/// Reads the body chunk by chunk, giving up once it passes `limit` bytes.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Bytes, FetchError> {
    let too_large = |len: u64| limit > 0 && len > limit as u64;

    if response.content_length().is_some_and(too_large) {
        return Err(FetchError::BodyTooLarge { limit });
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        if too_large((body.len() + chunk.len()) as u64) {
            return Err(FetchError::BodyTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Walks the source chain looking for an error of type `E`.
fn find_source<'a, E: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a E> {
    let mut current = Some(err);
    while let Some(candidate) = current {
        if let Some(found) = candidate.downcast_ref::<E>() {
            return Some(found);
        }
        current = candidate.source();
    }
    None
}

// ============================================================================
// Fixed-outcome implementation
// ============================================================================

/// [`Fetcher`] that answers every request with the same outcome.
///
/// Records the requests it receives. Used to drive the pipeline without a
/// network, since local test servers are themselves rejected by the URL
/// validator.
pub struct StaticFetcher {
    outcome: Result<FetchResponse, FetchError>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StaticFetcher {
    /// Answers with `status`, the given content type and body.
    pub fn ok(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(hyper::header::CONTENT_TYPE, value);
        }
        Self::with_outcome(Ok(FetchResponse {
            status,
            headers,
            body: body.into(),
        }))
    }

    /// Answers with `error`.
    pub fn failing(error: FetchError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<FetchResponse, FetchError>) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Adds a response header. Ignored for failing fetchers and invalid
    /// header names or values.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(response), Ok(name), Ok(value)) = (
            &mut self.outcome,
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers.append(name, value);
        }
        self
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match (&self.outcome, request.mode) {
            (Ok(response), FetchMode::Probe) => Ok(FetchResponse {
                body: Bytes::new(),
                ..response.clone()
            }),
            (Ok(response), FetchMode::Full)
                if request.max_response_size > 0
                    && response.body.len() > request.max_response_size =>
            {
                Err(FetchError::BodyTooLarge {
                    limit: request.max_response_size,
                })
            }
            (outcome, _) => outcome.clone(),
        }
    }
}
