//! Request ID middleware.
//!
//! Each request carries an `x-request-id`: the one set by an upstream proxy
//! when it looks sane, otherwise a fresh UUID v4. The ID is recorded on the
//! tracing span and the Sentry scope and echoed back in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID we accept as-is.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = upstream_request_id(request.headers().get(REQUEST_ID_HEADER))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// The proxy-supplied ID, if it is short printable ASCII.
fn upstream_request_id(value: Option<&HeaderValue>) -> Option<String> {
    let raw = value?.to_str().ok()?.trim();
    let acceptable = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LENGTH
        && raw.bytes().all(|b| b.is_ascii_graphic());
    acceptable.then(|| raw.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_is_kept() {
        let value = HeaderValue::from_static("cf-1234-abcd");
        assert_eq!(
            upstream_request_id(Some(&value)).as_deref(),
            Some("cf-1234-abcd")
        );
    }

    #[test]
    fn test_missing_or_odd_ids_are_replaced() {
        assert_eq!(upstream_request_id(None), None);
        assert_eq!(upstream_request_id(Some(&HeaderValue::from_static(""))), None);
        assert_eq!(
            upstream_request_id(Some(&HeaderValue::from_static("has space"))),
            None
        );

        let long = "a".repeat(MAX_REQUEST_ID_LENGTH + 1);
        let value = HeaderValue::from_str(&long).ok();
        assert_eq!(upstream_request_id(value.as_ref()), None);
    }
}
