//! Request and response snapshots exchanged between the engine, the
//! transport and the cache store.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// An intercepted outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
}

impl Request {
    /// Build a GET request for `url`.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url }
    }

    /// Build a request with an arbitrary method. The method is upper-cased.
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url }
    }

    /// Only GET requests are looked up in or written to the cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Identity of a request inside a cache store: method plus URL, fragment
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// How a response relates to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with readable headers and body.
    Basic,
    /// Cross-origin response permitted by CORS.
    Cors,
    /// Cross-origin response whose contents are hidden.
    Opaque,
    /// Redirect that was not followed.
    OpaqueRedirect,
    /// Network error surfaced as a response.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
            ResponseType::Error => "error",
        }
    }
}

impl std::str::FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "opaqueredirect" => Ok(ResponseType::OpaqueRedirect),
            "error" => Ok(ResponseType::Error),
            other => Err(format!("unknown response type: {other}")),
        }
    }
}

/// A response snapshot. Cloning is cheap: the body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    /// Final URL after redirects, if known.
    pub url: Option<Url>,
    pub redirected: bool,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// A same-origin 200 response with the given body.
    pub fn ok(url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            status_text: "OK".into(),
            response_type: ResponseType::Basic,
            url: Some(url),
            redirected: false,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = status;
        self.status_text = status_text.into();
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn redirected(mut self) -> Self {
        self.redirected = true;
        self
    }

    /// Status in the 200-299 range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this response may be written to a cache store: a basic,
    /// non-redirected response with status 200.
    pub fn is_storable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic && !self.redirected
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_strips_fragment() {
        let a = RequestKey::new("GET", &url("https://example.com/index.html#top"));
        let b = RequestKey::new("get", &url("https://example.com/index.html"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "GET https://example.com/index.html");
    }

    #[test]
    fn test_key_keeps_query() {
        let a = RequestKey::new("GET", &url("https://example.com/?v=1"));
        let b = RequestKey::new("GET", &url("https://example.com/?v=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_cacheable_only_get() {
        assert!(Request::get(url("https://example.com/")).is_cacheable());
        assert!(!Request::new("post", url("https://example.com/")).is_cacheable());
        assert_eq!(Request::new("post", url("https://example.com/")).method, "POST");
    }

    #[test]
    fn test_storable_basic_200() {
        let ok = Response::ok(url("https://example.com/"), "hi");
        assert!(ok.is_storable());
    }

    #[test]
    fn test_not_storable() {
        let base = Response::ok(url("https://example.com/"), "hi");
        assert!(!base.clone().with_status(404, "Not Found").is_storable());
        assert!(!base.clone().with_status(204, "No Content").is_storable());
        assert!(!base.clone().with_type(ResponseType::Opaque).is_storable());
        assert!(!base.clone().with_type(ResponseType::Cors).is_storable());
        assert!(!base.redirected().is_storable());
    }

    #[test]
    fn test_response_type_parse() {
        for ty in [
            ResponseType::Basic,
            ResponseType::Cors,
            ResponseType::Opaque,
            ResponseType::OpaqueRedirect,
            ResponseType::Error,
        ] {
            assert_eq!(ty.as_str().parse::<ResponseType>().unwrap(), ty);
        }
        assert!("weird".parse::<ResponseType>().is_err());
    }

    #[test]
    fn test_header_case_insensitive() {
        let r = Response::ok(url("https://example.com/"), "").with_header("Content-Type", "text/html");
        assert_eq!(r.header("content-type"), Some("text/html"));
        assert_eq!(r.header("etag"), None);
    }
}
