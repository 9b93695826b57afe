//! Response classification relative to the application origin.

use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, HeaderMap};
use shellcache_core::ResponseType;
use url::Url;

/// Classify a response the way a browser would for a request issued by a
/// page served from `app_origin`.
///
/// - same origin: `basic`
/// - cross origin with a matching `Access-Control-Allow-Origin`: `cors`
/// - anything else: `opaque`
pub fn classify(app_origin: &Url, response_url: &Url, headers: &HeaderMap) -> ResponseType {
    if response_url.origin() == app_origin.origin() {
        return ResponseType::Basic;
    }

    let allowed = headers
        .get(ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    match allowed {
        Some("*") => ResponseType::Cors,
        Some(origin) if origin == app_origin.origin().ascii_serialization() => ResponseType::Cors,
        _ => ResponseType::Opaque,
    }
}
