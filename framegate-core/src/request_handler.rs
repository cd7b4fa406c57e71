//! HTTP request handling for the page proxy.
//!
//! # Architecture
//!
//! The request handling flow:
//! 1. Reject non-GET methods and oversized declared bodies
//! 2. Validate the `url` parameter (no fetch is attempted on failure)
//! 3. Apply rate limiting to the caller
//! 4. Probe the target, or fetch and rewrite it
//! 5. Attach CORS headers to whatever response was produced
//!
//! Every failure becomes a [`ProxyError`] rendered as a JSON body; the
//! handler itself never fails.

use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::error::ProxyError;
use crate::fetch::{FetchMode, FetchRequest, FetchResponse, Fetcher};
use crate::rewrite::{DocumentRewriter, RewriteContext, SubstringRewriter, WidgetVersion};
use crate::types::{ConfigProvider, RateLimiter};
use crate::url_validator::{self, ValidatedUrl};
use crate::{classifier, client_id, headers, rate_limiter};

/// Parsed form of an inbound proxy call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyRequest {
    /// Raw `url` parameter, if present
    pub target_url: Option<String>,
    /// `test=true` was given
    pub is_test_probe: bool,
    pub widget_version: WidgetVersion,
    /// Every other parameter, in request order
    pub passthrough_params: Vec<(String, String)>,
}

impl ProxyRequest {
    /// Parses the (still percent-encoded) query string of a request.
    ///
    /// # Example
    ///
    /// ```
    /// use framegate_core::request_handler::ProxyRequest;
    /// use framegate_core::rewrite::WidgetVersion;
    ///
    /// let request = ProxyRequest::from_query(Some("url=example.com&widget_version=v2&brand=acme"));
    /// assert_eq!(request.target_url.as_deref(), Some("example.com"));
    /// assert_eq!(request.widget_version, WidgetVersion::V2);
    /// assert_eq!(request.passthrough_params.len(), 2);
    /// ```
    pub fn from_query(query: Option<&str>) -> Self {
        let mut request = Self::default();

        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            // `url` and `test` steer the proxy; everything else reaches the widget
            match key.as_ref() {
                "url" => {
                    if request.target_url.is_none() {
                        request.target_url = Some(value.into_owned());
                    }
                    continue;
                }
                "test" => {
                    request.is_test_probe = value == "true";
                    continue;
                }
                "widget_version" => {
                    request.widget_version = WidgetVersion::from_param(Some(value.as_ref()));
                }
                _ => {}
            }
            request
                .passthrough_params
                .push((key.into_owned(), value.into_owned()));
        }

        request
    }
}

/// Shared collaborators of the request handler.
///
/// Constructed once at startup; clones share state.
#[derive(Clone)]
pub struct ProxyServices {
    pub limiter: RateLimiter,
    pub fetcher: Arc<dyn Fetcher>,
    pub rewriter: Arc<dyn DocumentRewriter>,
}

impl ProxyServices {
    /// Services using the default [`SubstringRewriter`].
    pub fn new(limiter: RateLimiter, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            limiter,
            fetcher,
            rewriter: Arc::new(SubstringRewriter),
        }
    }

    /// Replaces the document rewriter.
    pub fn with_rewriter(mut self, rewriter: Arc<dyn DocumentRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }
}

/// Handles an incoming HTTP request through the proxy pipeline.
///
/// The request body is never read; only its declared length is checked.
///
/// # Arguments
///
/// * `req` - The incoming HTTP request
/// * `peer` - TCP peer address, used when no proxy header names the client
/// * `config` - Configuration provider for all settings
/// * `services` - Rate limiter, fetcher and rewriter
///
/// # Returns
///
/// Always returns `Ok` with either the proxied page, a probe result, or a
/// JSON error response (400, 403, 404, 405, 408, 413, 429, 500, 502).
pub async fn handle_request<B, C: ConfigProvider>(
    req: Request<B>,
    peer: Option<SocketAddr>,
    config: Arc<C>,
    services: ProxyServices,
) -> Result<Response<Full<bytes::Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let client = client_id::extract_client_id(&parts.headers, peer);
    let proxy_request = ProxyRequest::from_query(parts.uri.query());

    let mut response = match process(&parts, &proxy_request, &client, config.as_ref(), &services)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            log_failure(&err, &client);
            create_error_response(&err, config.expose_error_details())
        }
    };

    apply_cors_headers(&mut response);

    let target = proxy_request
        .target_url
        .as_deref()
        .map(url_validator::sanitize_for_display)
        .unwrap_or_default();
    info!(
        client = %client,
        method = %parts.method,
        target = %target,
        probe = proxy_request.is_test_probe,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Proxy request completed"
    );

    Ok(response)
}

async fn process(
    parts: &Parts,
    proxy_request: &ProxyRequest,
    client: &str,
    config: &impl ConfigProvider,
    services: &ProxyServices,
) -> Result<Response<Full<bytes::Bytes>>, ProxyError> {
    if parts.method != Method::GET {
        return Err(ProxyError::MethodNotAllowed);
    }

    check_declared_body_size(parts, config)?;

    let target = url_validator::validate(proxy_request.target_url.as_deref())?;

    let decision = rate_limiter::admit(&services.limiter, client, config).await;
    if !decision.allowed {
        return Err(ProxyError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    let proxy_config = config.proxy_config();
    if proxy_request.is_test_probe {
        let request = FetchRequest {
            url: target.url().as_str().to_string(),
            mode: FetchMode::Probe,
            timeout: proxy_config.probe_timeout,
            max_response_size: proxy_config.max_response_size,
        };
        services
            .fetcher
            .fetch(&request)
            .await
            .map_err(|err| classifier::classify(&err))?;
        return Ok(probe_success_response(&target));
    }

    let request = FetchRequest {
        url: target.url().as_str().to_string(),
        mode: FetchMode::Full,
        timeout: proxy_config.fetch_timeout,
        max_response_size: proxy_config.max_response_size,
    };
    let upstream = services
        .fetcher
        .fetch(&request)
        .await
        .map_err(|err| classifier::classify(&err))?;

    if upstream.status >= 400 {
        debug!(status = upstream.status, "Upstream answered with a client error");
    }

    let body = match rewritable_html(&upstream) {
        Some(html) => {
            let widget_origin = widget_origin(parts);
            let context = RewriteContext {
                target: &target,
                widget_origin: &widget_origin,
                widget_version: proxy_request.widget_version,
                passthrough: &proxy_request.passthrough_params,
            };
            bytes::Bytes::from(services.rewriter.rewrite(html, &context))
        }
        None => upstream.body.clone(),
    };

    build_page_response(&target, &upstream, body)
}

/// Returns the page as text when it can be rewritten in place.
///
/// Encoded bodies and HTML that is not valid UTF-8 are relayed untouched,
/// together with the headers that describe them.
fn rewritable_html(upstream: &FetchResponse) -> Option<&str> {
    if !upstream.is_html() {
        return None;
    }
    if upstream.is_encoded() {
        debug!("Upstream HTML still carries a content coding, relaying it unchanged");
        return None;
    }
    match std::str::from_utf8(&upstream.body) {
        Ok(html) => Some(html),
        Err(_) => {
            debug!("Upstream HTML is not valid UTF-8, relaying it unchanged");
            None
        }
    }
}

/// Rejects requests whose declared `Content-Length` exceeds the ceiling.
fn check_declared_body_size(parts: &Parts, config: &impl ConfigProvider) -> Result<(), ProxyError> {
    let max = config.proxy_config().max_body_size as u64;
    if max == 0 {
        return Ok(());
    }

    let declared = parts
        .headers
        .get(headers::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    match declared {
        Some(size) if size > max => Err(ProxyError::PayloadTooLarge { size, max }),
        _ => Ok(()),
    }
}

/// Public origin of this proxy as seen by the caller.
fn widget_origin(parts: &Parts) -> String {
    let proto = parts
        .headers
        .get(headers::X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");

    let host = parts
        .headers
        .get(headers::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string());

    format!("{proto}://{host}")
}

fn probe_success_response(target: &ValidatedUrl) -> Response<Full<bytes::Bytes>> {
    let body = serde_json::json!({
        "success": true,
        "url": target.normalized(),
    });
    json_response(StatusCode::OK, body.to_string())
}

/// Builds the 200 response carrying an upstream page.
fn build_page_response(
    target: &ValidatedUrl,
    upstream: &FetchResponse,
    body: bytes::Bytes,
) -> Result<Response<Full<bytes::Bytes>>, ProxyError> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = StatusCode::OK;

    let response_headers = response.headers_mut();
    for (name, value) in upstream.headers.iter() {
        if !headers::is_stripped_upstream_header(name.as_str()) {
            response_headers.append(name.clone(), value.clone());
        }
    }

    let proxied = HeaderValue::from_str(target.url().as_str())
        .map_err(|err| ProxyError::Internal(format!("invalid proxied URL header: {err}")))?;
    response_headers.insert(HeaderName::from_static(headers::X_PROXIED_URL), proxied);

    Ok(response)
}

fn json_response(status: StatusCode, body: String) -> Response<Full<bytes::Bytes>> {
    let mut response = Response::new(Full::new(bytes::Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Creates the JSON error response for `err`.
///
/// Rate-limited responses also carry `Retry-After`; 405 responses carry
/// `Allow: GET`.
///
/// # Example
///
/// ```
/// use framegate_core::error::ProxyError;
/// use framegate_core::request_handler::create_error_response;
/// use hyper::StatusCode;
///
/// let response = create_error_response(&ProxyError::RateLimited { retry_after_secs: 7 }, false);
/// assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
/// assert_eq!(response.headers().get("retry-after").unwrap(), "7");
/// ```
pub fn create_error_response(
    err: &ProxyError,
    expose_details: bool,
) -> Response<Full<bytes::Bytes>> {
    let mut response = json_response(err.status_code(), err.to_body(expose_details).to_json());

    match err {
        ProxyError::RateLimited { retry_after_secs } => {
            response.headers_mut().insert(
                HeaderName::from_static(headers::RETRY_AFTER),
                HeaderValue::from(*retry_after_secs),
            );
        }
        ProxyError::MethodNotAllowed => {
            response.headers_mut().insert(
                HeaderName::from_static(headers::ALLOW),
                HeaderValue::from_static("GET"),
            );
        }
        _ => {}
    }

    response
}

/// Adds the permissive CORS headers to a response.
pub fn apply_cors_headers<B>(response: &mut Response<B>) {
    let response_headers = response.headers_mut();
    response_headers.insert(
        HeaderName::from_static(headers::ACCESS_CONTROL_ALLOW_ORIGIN),
        HeaderValue::from_static(headers::CORS_ALLOW_ORIGIN),
    );
    response_headers.insert(
        HeaderName::from_static(headers::ACCESS_CONTROL_ALLOW_METHODS),
        HeaderValue::from_static(headers::CORS_ALLOW_METHODS),
    );
    response_headers.insert(
        HeaderName::from_static(headers::ACCESS_CONTROL_ALLOW_HEADERS),
        HeaderValue::from_static(headers::CORS_ALLOW_HEADERS),
    );
}

fn log_failure(err: &ProxyError, client: &str) {
    match err {
        ProxyError::Internal(details) => {
            error!(client = %client, details = %details, "Internal proxy failure");
        }
        err if err.is_server_error() => {
            warn!(client = %client, code = err.code(), error = %err, "Upstream fetch failed");
        }
        err => {
            debug!(client = %client, code = err.code(), error = %err, "Request rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorBody;
    use crate::fetch::{FetchError, StaticFetcher};
    use crate::test_utils::TestConfig;
    use http_body_util::BodyExt;

    const PAGE: &str = r#"<html><head><title>Shop</title></head><body><a href="/cart">Cart</a><a href="/help">Help</a></body></html>"#;

    fn services(fetcher: StaticFetcher) -> (ProxyServices, Arc<StaticFetcher>) {
        let fetcher = Arc::new(fetcher);
        let services = ProxyServices::new(RateLimiter::new(), fetcher.clone());
        (services, fetcher)
    }

    fn html_fetcher() -> StaticFetcher {
        StaticFetcher::ok(200, "text/html; charset=utf-8", PAGE)
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .header("host", "proxy.test")
            .header("x-forwarded-for", "203.0.113.7")
            .body(())
            .unwrap()
    }

    async fn send(
        req: Request<()>,
        config: TestConfig,
        services: ProxyServices,
    ) -> Response<Full<bytes::Bytes>> {
        handle_request(req, None, Arc::new(config), services)
            .await
            .unwrap()
    }

    async fn body_string(response: Response<Full<bytes::Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn error_body(response: Response<Full<bytes::Bytes>>) -> ErrorBody {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    // ===========================================
    // ProxyRequest parsing
    // ===========================================

    #[test]
    fn test_parse_control_params() {
        let request = ProxyRequest::from_query(Some("url=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&test=true"));
        assert_eq!(request.target_url.as_deref(), Some("https://example.com/a?b=1"));
        assert!(request.is_test_probe);
        assert!(request.passthrough_params.is_empty());
    }

    #[test]
    fn test_parse_test_must_be_exactly_true() {
        assert!(!ProxyRequest::from_query(Some("url=a.com&test=1")).is_test_probe);
        assert!(!ProxyRequest::from_query(Some("url=a.com&test=TRUE")).is_test_probe);
    }

    #[test]
    fn test_parse_passthrough_keeps_order() {
        let request =
            ProxyRequest::from_query(Some("brand=acme&url=a.com&theme=dark+mode&widget_version=v2"));
        assert_eq!(
            request.passthrough_params,
            vec![
                ("brand".to_string(), "acme".to_string()),
                ("theme".to_string(), "dark mode".to_string()),
                ("widget_version".to_string(), "v2".to_string()),
            ]
        );
        assert_eq!(request.widget_version, WidgetVersion::V2);
    }

    #[test]
    fn test_parse_missing_query() {
        assert_eq!(ProxyRequest::from_query(None), ProxyRequest::default());
    }

    // ===========================================
    // Input rejection
    // ===========================================

    #[tokio::test]
    async fn test_non_get_is_405() {
        let (services, fetcher) = services(html_fetcher());
        let req = Request::builder()
            .method("POST")
            .uri("/?url=example.com")
            .body(())
            .unwrap();

        let response = send(req, TestConfig::new(), services).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get("allow").unwrap(), "GET");
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_declared_body_is_413() {
        let (services, _) = services(html_fetcher());
        let req = Request::builder()
            .uri("/?url=example.com")
            .header("content-length", "2048")
            .body(())
            .unwrap();

        let config = TestConfig::new().with_max_body_size(1024);
        let response = send(req, config, services).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_url_is_400() {
        let (services, fetcher) = services(html_fetcher());
        let response = send(get("/"), TestConfig::new(), services).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body.error, "Please enter a URL");
        assert_eq!(body.code.as_deref(), Some("INVALID_URL"));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_private_target_is_403_without_fetch() {
        let (services, fetcher) = services(html_fetcher());
        let response = send(get("/?url=http://192.168.1.1/"), TestConfig::new(), services).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = error_body(response).await;
        assert_eq!(body.error, "Private IP addresses are not allowed");
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_target_does_not_consume_quota() {
        let (services, _) = services(html_fetcher());
        let config = TestConfig::new().with_rate_limit(1, 60);

        let response = send(get("/?url=localhost"), config.clone(), services.clone()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(get("/?url=example.com"), config, services).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ===========================================
    // Rate limiting
    // ===========================================

    #[tokio::test]
    async fn test_rate_limited_is_429_with_retry_after() {
        let (services, _) = services(html_fetcher());
        let config = TestConfig::new().with_rate_limit(2, 60);

        for _ in 0..2 {
            let response = send(get("/?url=example.com"), config.clone(), services.clone()).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = send(get("/?url=example.com"), config, services).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");

        let body = error_body(response).await;
        assert_eq!(body.code.as_deref(), Some("RATE_LIMITED"));
        let retry_after = body.retry_after.unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
    }

    #[tokio::test]
    async fn test_rate_limit_keyed_by_forwarded_client() {
        let (services, _) = services(html_fetcher());
        let config = TestConfig::new().with_rate_limit(1, 60);

        let response = send(get("/?url=example.com"), config.clone(), services.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let other = Request::builder()
            .uri("/?url=example.com")
            .header("x-forwarded-for", "198.51.100.9")
            .body(())
            .unwrap();
        let response = send(other, config, services).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ===========================================
    // Probe mode
    // ===========================================

    #[tokio::test]
    async fn test_probe_success_body() {
        let (services, fetcher) = services(html_fetcher());
        let response = send(get("/?url=example.com&test=true"), TestConfig::new(), services).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["url"], "https://example.com");

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mode, FetchMode::Probe);
        assert_eq!(requests[0].timeout, std::time::Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_probe_timeout_is_408() {
        let (services, _) = services(StaticFetcher::failing(FetchError::Timeout));
        let response = send(get("/?url=example.com&test=true"), TestConfig::new(), services).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = error_body(response).await;
        assert_eq!(body.code.as_deref(), Some("TIMEOUT"));
        assert!(body.suggestion.is_some());
    }

    // ===========================================
    // Full fetch
    // ===========================================

    #[tokio::test]
    async fn test_full_fetch_rewrites_html() {
        let (services, fetcher) = services(html_fetcher());
        let response = send(
            get("/?url=https%3A%2F%2Fshop.example.com%2Fitems&brand=acme"),
            TestConfig::new(),
            services,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-proxied-url").unwrap(),
            "https://shop.example.com/items"
        );
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );

        let body = body_string(response).await;
        assert!(body.contains(r#"<head><base href="https://shop.example.com/items">"#));
        assert!(body.contains(r#"<a href="https://shop.example.com/cart">"#));
        assert!(body.contains(r#"<a href="/help">"#));
        assert!(body.contains(r#"<script src="http://proxy.test/widget.js"></script></head>"#));
        assert!(body.contains(r#"[["brand","acme"]]"#));

        let requests = fetcher.requests();
        assert_eq!(requests[0].mode, FetchMode::Full);
        assert_eq!(requests[0].url, "https://shop.example.com/items");
        assert_eq!(requests[0].timeout, std::time::Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_widget_origin_honours_forwarded_proto() {
        let (services, _) = services(html_fetcher());
        let req = Request::builder()
            .uri("/?url=example.com&widget_version=v2")
            .header("host", "widgets.example.org")
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();

        let body = body_string(send(req, TestConfig::new(), services).await).await;
        assert!(body.contains(r#"<script src="https://widgets.example.org/widget-v2.js">"#));
    }

    #[tokio::test]
    async fn test_frame_blocking_headers_stripped() {
        let fetcher = html_fetcher()
            .with_header("x-frame-options", "DENY")
            .with_header("content-security-policy", "frame-ancestors 'none'")
            .with_header("content-length", "999")
            .with_header("cache-control", "no-cache");
        let (services, _) = services(fetcher);

        let response = send(get("/?url=example.com"), TestConfig::new(), services).await;
        let response_headers = response.headers();
        assert!(response_headers.get("x-frame-options").is_none());
        assert!(response_headers.get("content-security-policy").is_none());
        assert_ne!(
            response_headers.get("content-length").map(|v| v.to_str().unwrap()),
            Some("999")
        );
        assert_eq!(response_headers.get("cache-control").unwrap(), "no-cache");
        assert_eq!(
            response_headers.get("access-control-allow-methods").unwrap(),
            headers::CORS_ALLOW_METHODS
        );
    }

    #[tokio::test]
    async fn test_non_html_body_passes_through() {
        let (services, _) = services(StaticFetcher::ok(200, "application/json", r#"{"href":"/x"}"#));
        let response = send(get("/?url=api.example.com/data"), TestConfig::new(), services).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"href":"/x"}"#);
    }

    #[tokio::test]
    async fn test_non_utf8_html_passes_through() {
        // "café" in ISO-8859-1
        let latin1: &[u8] = b"<html><head></head><body>caf\xe9</body></html>";
        let fetcher = StaticFetcher::ok(200, "text/html; charset=iso-8859-1", latin1.to_vec());
        let (services, _) = services(fetcher);

        let response = send(get("/?url=example.com"), TestConfig::new(), services).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html; charset=iso-8859-1"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), latin1);
    }

    #[tokio::test]
    async fn test_encoded_html_passes_through_with_its_coding() {
        let fetcher = StaticFetcher::ok(200, "text/html", vec![0x28, 0xb5, 0x2f, 0xfd, 0x00])
            .with_header("content-encoding", "zstd");
        let (services, _) = services(fetcher);

        let response = send(get("/?url=example.com"), TestConfig::new(), services).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-encoding").unwrap(), "zstd");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), &[0x28, 0xb5, 0x2f, 0xfd, 0x00]);
    }

    #[tokio::test]
    async fn test_oversized_upstream_page_rejected() {
        let (services, fetcher) = services(html_fetcher());
        let config = TestConfig::new().with_max_response_size(16);

        let response = send(get("/?url=example.com"), config, services).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body.code.as_deref(), Some("FETCH_FAILED"));
        assert_eq!(fetcher.requests()[0].max_response_size, 16);
    }

    #[tokio::test]
    async fn test_custom_rewriter_is_used() {
        struct Uppercase;

        impl DocumentRewriter for Uppercase {
            fn rewrite(&self, html: &str, _context: &RewriteContext<'_>) -> String {
                html.to_uppercase()
            }
        }

        let (services, _) = services(html_fetcher());
        let services = services.with_rewriter(Arc::new(Uppercase));

        let body = body_string(send(get("/?url=example.com"), TestConfig::new(), services).await).await;
        assert!(body.starts_with("<HTML><HEAD><TITLE>SHOP"));
        assert!(!body.contains("<base href"));
    }

    #[tokio::test]
    async fn test_upstream_client_error_still_200() {
        let (services, _) = services(StaticFetcher::ok(404, "text/html", "<p>gone</p>"));
        let response = send(get("/?url=example.com/missing"), TestConfig::new(), services).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_classified_fetch_failures() {
        let cases = [
            (FetchError::ConnectionRefused, StatusCode::BAD_GATEWAY),
            (FetchError::NoResponse, StatusCode::BAD_GATEWAY),
            (FetchError::TooManyRedirects, StatusCode::BAD_GATEWAY),
            (FetchError::HttpStatus(404), StatusCode::NOT_FOUND),
            (FetchError::HttpStatus(403), StatusCode::FORBIDDEN),
            (FetchError::HttpStatus(500), StatusCode::BAD_GATEWAY),
            (FetchError::Other("boom".to_string()), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            let (services, _) = services(StaticFetcher::failing(error.clone()));
            let response = send(get("/?url=example.com"), TestConfig::new(), services).await;
            assert_eq!(response.status(), expected, "{error:?}");
        }
    }

    #[tokio::test]
    async fn test_error_details_follow_disclosure_setting() {
        let (services, _) = services(StaticFetcher::failing(FetchError::Other("tls alert".to_string())));
        let hidden = error_body(send(get("/?url=example.com"), TestConfig::new(), services.clone()).await).await;
        assert_eq!(hidden.details, None);

        let shown = error_body(
            send(get("/?url=example.com"), TestConfig::new().with_error_details(), services).await,
        )
        .await;
        assert_eq!(shown.details.as_deref(), Some("tls alert"));
    }

    // ===========================================
    // Response helpers
    // ===========================================

    #[tokio::test]
    async fn test_create_error_response_is_json() {
        let response = create_error_response(&ProxyError::NotFound, false);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body = error_body(response).await;
        assert_eq!(body.error, "Page not found");
    }

    #[test]
    fn test_widget_origin_defaults() {
        let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        assert_eq!(widget_origin(&parts), "http://localhost");

        let (parts, _) = Request::builder()
            .uri("/")
            .header("host", "proxy.test:3000")
            .header("x-forwarded-proto", "https, http")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(widget_origin(&parts), "https://proxy.test:3000");
    }
}
