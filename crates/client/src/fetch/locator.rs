//! Locator resolution for intercepted requests.

use url::Url;

/// Error type for locator resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a locator the way the application shell would request it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative paths against `root`; absolute URLs pass through
/// 3. Only http and https are allowed
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn resolve_locator(root: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = root.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("http://localhost:8080/app/").unwrap()
    }

    #[test]
    fn test_resolve_relative() {
        let url = resolve_locator(&root(), "./index.html").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/app/index.html");
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve_locator(&root(), "/icon.png").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/icon.png");
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let url = resolve_locator(&root(), "https://CDN.example.com/lib.js").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve_locator(&root(), "./#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/app/");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve_locator(&root(), "data.json?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve_locator(&root(), "  index.html  ").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/app/index.html");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve_locator(&root(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve_locator(&root(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve_locator(&root(), "   "), Err(UrlError::Empty)));
    }
}
