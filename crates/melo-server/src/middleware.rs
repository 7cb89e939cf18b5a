// File: src/middleware.rs
// Purpose: Request logging middleware with correlation ids

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use melo_logging::{correlation_id_from, Logger, RequestInfo, ResponseInfo, CORRELATION_ID_HEADER};

use crate::state::AppState;

/// Requests with larger bodies are rejected before reaching a handler
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Per-request logging context, available to handlers as an extension
#[derive(Clone)]
pub struct RequestLog {
    pub correlation_id: String,
    pub logger: Logger,
}

fn header_pairs(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::HeaderName::from_static("x-forwarded-for"))
        .and_then(|v| v.split(',').next())
        .or_else(|| header_str(headers, header::HeaderName::from_static("x-real-ip")))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Log every request's arrival and completion, and echo its correlation id
pub async fn request_logging(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_logger = &state.request_logger;
    let (parts, body) = request.into_parts();

    let body = to_bytes(body, MAX_REQUEST_BODY).await;

    let (correlation_id, info) = {
        let pairs = header_pairs(&parts.headers);
        let correlation_id = correlation_id_from(pairs.iter().copied());

        let captured_body = match &body {
            Ok(bytes) => request_logger.capture_body(header_str(&parts.headers, header::CONTENT_TYPE), bytes),
            Err(_) => None,
        };

        let info = RequestInfo {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: request_logger.capture_headers(pairs.iter().copied()),
            body: captured_body,
            client_ip: client_ip(&parts.headers),
            user_agent: header_str(&parts.headers, header::USER_AGENT).map(str::to_string),
        };
        (correlation_id, info)
    };

    let span = request_logger.start(correlation_id.clone(), info).await;

    let bytes = match body {
        Ok(bytes) => bytes,
        Err(err) => {
            request_logger.fail(span, &err).await;
            let mut response = (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
            set_correlation_header(&mut response, &correlation_id);
            return response;
        }
    };

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(RequestLog {
        correlation_id: correlation_id.clone(),
        logger: request_logger.logger_for(&span),
    });

    let mut response = next.run(request).await;
    set_correlation_header(&mut response, &correlation_id);

    let response_info = ResponseInfo {
        status_code: response.status().as_u16(),
        headers: request_logger.capture_headers(header_pairs(response.headers())),
        content_length: header_str(response.headers(), header::CONTENT_LENGTH).and_then(|v| v.parse().ok()),
    };
    request_logger.finish(span, response_info).await;

    response
}

fn set_correlation_header(response: &mut Response, correlation_id: &str) {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
}
