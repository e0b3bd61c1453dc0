//! Per-request ids. The middleware runs outside the `TraceLayer`, so the id
//! it assigns is already on the request when the trace span is made.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

const HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Reuse the caller's `x-request-id` or assign a UUID v4. The id is stored
/// as a request extension and echoed on the response.
pub async fn request_id_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let id = headers
        .get(HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(HEADER, val);
    }
    response
}

fn request_id_of(request: &Request) -> &str {
    request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.as_str())
        .unwrap_or("-")
}

/// `TraceLayer` span carrying the request id, so every log line emitted while
/// serving a request can be matched to the response header.
pub fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id_of(request),
        method = %request.method(),
        path = %request.uri().path(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn echo_router() -> Router {
        Router::new()
            .route("/", get(|Extension(id): Extension<RequestId>| async move { id.0 }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_incoming_id_is_kept() {
        let response = echo_router()
            .oneshot(http::Request::builder().uri("/").header(HEADER, "abc-123").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers()[HEADER], "abc-123");
        assert_eq!(body_text(response).await, "abc-123");
    }

    #[tokio::test]
    async fn test_missing_id_gets_uuid() {
        let response = echo_router()
            .oneshot(http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers()[HEADER].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(body_text(response).await, header);
    }

    #[test]
    fn test_span_reads_extension() {
        let mut request = http::Request::builder().uri("/predict").body(Body::empty()).unwrap();
        assert_eq!(request_id_of(&request), "-");

        request.extensions_mut().insert(RequestId("req-7".to_string()));
        assert_eq!(request_id_of(&request), "req-7");
    }
}
