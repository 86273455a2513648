use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request logging: method, URI, status and latency, all inside a span
/// tagged with the request id. The id is echoed back in `x-request-id`.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let span = tracing::info_span!("request", id = %request_id);
    let start_time = Instant::now();

    let mut response = async {
        tracing::info!("Request started: {} {} - User-Agent: {}", method, uri, user_agent);
        let response = next.run(req).await;
        tracing::info!(
            "Request completed: {} {} - {} - {}ms",
            method,
            uri,
            response.status(),
            start_time.elapsed().as_millis()
        );
        response
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}
