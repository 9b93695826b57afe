//! HTTP transport for the caching engine.
//!
//! ### Response typing
//! - Same-origin responses are `basic`
//! - Cross-origin responses are `cors` when allowed, otherwise `opaque`
//! - Opaque responses are stripped to status 0 with no headers or body
//!
//! ### Limits
//! - Max redirects: 5 (redirected responses are flagged)
//! - Request timeout: 20s (configurable); the engine itself imposes none

pub mod locator;
pub mod origin;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use shellcache_core::{AppConfig, Error, Request, Response, ResponseType, Transport};
use std::time::{Duration, Instant};

pub use locator::{UrlError, resolve_locator};
pub use origin::classify;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin the application shell is served from.
    pub app_origin: url::Url,
}

impl TransportConfig {
    /// Default limits for an application served from `app_origin`.
    pub fn new(app_origin: url::Url) -> Self {
        Self { user_agent: "shellcache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5, app_origin }
    }

    /// Build from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let app_origin = config.app_root_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), max_redirects: 5, app_origin })
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    http: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

fn collect_headers(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else if err.is_redirect() {
        format!("too many redirects: {err}")
    } else {
        format!("network error: {err}")
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::Network(format!("invalid method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(describe(&e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let mut requested = request.url.clone();
        requested.set_fragment(None);
        let redirected = final_url != requested;

        let response_type = classify(&self.config.app_origin, &final_url, &headers);

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            response_type = response_type.as_str(),
            bytes = body.len(),
            fetch_ms,
            "fetched"
        );

        if response_type == ResponseType::Opaque {
            return Ok(Response {
                status: 0,
                status_text: String::new(),
                response_type,
                url: None,
                redirected,
                headers: Vec::new(),
                body: Bytes::new(),
            });
        }

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            url: Some(final_url),
            redirected,
            headers: collect_headers(&headers),
            body,
        })
    }
}
