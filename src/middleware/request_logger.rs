use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_BODY_LOG_SIZE: usize = 1024; // 1KB limit for body logging

pub async fn request_logger_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let header_value = HeaderValue::from_str(&request_id).ok();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    // Downstream extractors read the id from the request headers.
    if let Some(value) = header_value.clone() {
        req.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let content_length = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse::<usize>().ok());

    match content_length {
        Some(len) if state.log_request_body && len > 0 && len <= MAX_BODY_LOG_SIZE => {
            let (parts, body) = req.into_parts();
            let bytes = match hyper::body::to_bytes(body).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        method = %method,
                        uri = %uri,
                        error = %e,
                        "Failed to read request body"
                    );
                    let mut response =
                        AppError::BadRequest("failed to read request body".to_string())
                            .into_response();
                    if let Some(value) = header_value {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }
                    return response;
                }
            };

            let sanitized_body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(json) => serde_json::to_string(&crate::utils::sanitize::sanitize_json(&json))
                    .unwrap_or_else(|_| "[invalid json]".to_string()),
                Err(_) => format!("[non-json, {} bytes]", bytes.len()),
            };

            tracing::info!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                body_size = bytes.len(),
                body = %sanitized_body,
                "Incoming request"
            );

            req = Request::from_parts(parts, Body::from(bytes));
        }
        _ => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                "Incoming request"
            );
        }
    }

    let response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = latency.as_millis(),
        "Outgoing response"
    );

    let (mut parts, body) = response.into_parts();
    if let Some(value) = header_value {
        parts.headers.insert(REQUEST_ID_HEADER, value);
    }

    Response::from_parts(parts, body)
}
