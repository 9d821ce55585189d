//! Host and origin checks.
//!
//! Requests whose `Host` is not in `ALLOWED_HOSTS` get a 400. Unsafe-method
//! requests carrying an `Origin` (or, failing that, a `Referer`) from a
//! foreign site get a 403 unless the origin is listed in
//! `CSRF_TRUSTED_ORIGINS`.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, StatusCode,
        header::{HOST, ORIGIN, REFERER},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::Url;

use crate::state::AppState;

/// Reject requests for hosts this deployment does not serve.
pub async fn allowed_hosts_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let host = request_host(request.headers(), request.uri());

    if !host.as_deref().is_some_and(|h| state.config().allowed_hosts.allows(h)) {
        tracing::warn!(host = host.as_deref().unwrap_or(""), "disallowed host");
        return (StatusCode::BAD_REQUEST, "Bad Request (invalid host)").into_response();
    }

    next.run(request).await
}

/// Reject cross-site form submissions.
pub async fn origin_check_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !request.method().is_safe() {
        let headers = request.headers();
        let source = headers
            .get(ORIGIN)
            .or_else(|| headers.get(REFERER))
            .and_then(|v| v.to_str().ok());

        if let (Some(source), Some(host)) = (source, request_host(headers, request.uri()))
            && !origin_allowed(source, &host, &state.config().csrf_trusted_origins)
        {
            tracing::warn!(origin = source, %host, "cross-site request rejected");
            return (StatusCode::FORBIDDEN, "Forbidden (origin checking failed)").into_response();
        }
    }

    next.run(request).await
}

fn request_host(headers: &HeaderMap, uri: &axum::http::Uri) -> Option<String> {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| uri.authority().map(|a| a.as_str().to_owned()))
}

/// Whether a request from `source` (an origin or referer URL) may post to `host`.
fn origin_allowed(source: &str, host: &str, trusted: &[String]) -> bool {
    let Ok(url) = Url::parse(source) else {
        return false;
    };
    let origin = url.origin().ascii_serialization();

    let same_host = url.host_str().is_some_and(|h| {
        let authority = url
            .port()
            .map_or_else(|| h.to_owned(), |port| format!("{h}:{port}"));
        authority.eq_ignore_ascii_case(host)
    });

    same_host || trusted.iter().any(|t| t.trim_end_matches('/') == origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_is_allowed() {
        assert!(origin_allowed("https://shop.example", "shop.example", &[]));
        assert!(origin_allowed(
            "http://localhost:8000/cart",
            "localhost:8000",
            &[]
        ));
    }

    #[test]
    fn test_foreign_origin_is_rejected() {
        assert!(!origin_allowed("https://evil.example", "shop.example", &[]));
        assert!(!origin_allowed("not a url", "shop.example", &[]));
        assert!(!origin_allowed(
            "http://localhost:9000",
            "localhost:8000",
            &[]
        ));
    }

    #[test]
    fn test_trusted_origin_is_allowed() {
        let trusted = vec!["https://pay.example/".to_owned()];
        assert!(origin_allowed("https://pay.example", "shop.example", &trusted));
        assert!(!origin_allowed("http://pay.example", "shop.example", &trusted));
    }
}
