// File: src/request.rs
// Purpose: Request/response logging with correlation ids, redaction and in-flight tracking

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::{LoggerConfig, RequestLogConfig};
use crate::entry::{
    EntryKind, ErrorDetails, LogEntry, LogLevel, RequestInfo, RequestRecord, ResponseInfo, Timing,
};
use crate::logger::{LogContext, Logger};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const REDACTED: &str = "[REDACTED]";
const TRUNCATED_SUFFIX: &str = "...[truncated]";

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "proxy-authorization",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
];

const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "new_password",
    "newpassword",
    "token",
    "access_token",
    "accesstoken",
    "refresh_token",
    "refreshtoken",
    "secret",
    "client_secret",
    "api_key",
    "apikey",
    "authorization",
];

pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_FIELDS.contains(&lower.as_str())
}

/// Replace sensitive object fields anywhere in a JSON document
pub fn redact_json(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_sensitive_field(key) {
                    *v = JsonValue::String(REDACTED.to_string());
                } else {
                    redact_json(v);
                }
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {}
    }
}

/// Cut `text` to at most `max` bytes on a char boundary, marking the cut
pub fn truncate_body(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }

    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATED_SUFFIX)
}

/// Pick the inbound correlation id, or mint one
pub fn correlation_id_from<'a>(headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut request_id = None;
    for (name, value) in headers {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if name.eq_ignore_ascii_case(CORRELATION_ID_HEADER) {
            return value.to_string();
        }
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            request_id = Some(value.to_string());
        }
    }
    request_id.unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// A request currently being served
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InFlightRequest {
    /// Registry key; distinct even when clients reuse a correlation id
    pub id: Uuid,
    pub correlation_id: String,
    pub method: String,
    pub path: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    registered: Option<Instant>,
}

impl InFlightRequest {
    pub fn age(&self) -> Duration {
        self.registered.map(|i| i.elapsed()).unwrap_or_default()
    }
}

/// Time-bounded registry of in-flight requests.
///
/// Entries are removed when their request finishes, or swept once older
/// than the TTL so requests that never complete cannot grow it unbounded.
#[derive(Debug, Clone)]
pub struct InFlightRequests {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<Uuid, InFlightRequest>>>,
}

impl InFlightRequests {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a request and return the key to remove it with
    pub async fn insert(&self, correlation_id: &str, method: &str, path: &str) -> Uuid {
        let id = Uuid::new_v4();
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, r| r.age() < ttl);
        entries.insert(
            id,
            InFlightRequest {
                id,
                correlation_id: correlation_id.to_string(),
                method: method.to_string(),
                path: path.to_string(),
                started_at: Utc::now(),
                registered: Some(Instant::now()),
            },
        );
        id
    }

    pub async fn remove(&self, id: Uuid) -> Option<InFlightRequest> {
        self.entries.write().await.remove(&id)
    }

    /// Drop and return every entry older than the TTL
    pub async fn sweep_expired(&self) -> Vec<InFlightRequest> {
        let mut entries = self.entries.write().await;
        let expired: Vec<Uuid> = entries
            .iter()
            .filter(|(_, r)| r.age() >= self.ttl)
            .map(|(id, _)| *id)
            .collect();

        expired.iter().filter_map(|id| entries.remove(id)).collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Current entries, oldest first
    pub async fn snapshot(&self) -> Vec<InFlightRequest> {
        let mut list: Vec<InFlightRequest> = self.entries.read().await.values().cloned().collect();
        list.sort_by_key(|r| r.started_at);
        list
    }
}

/// Timing and identity of one request, carried from `start` to `finish`
#[derive(Debug, Clone)]
pub struct RequestSpan {
    pub correlation_id: String,
    pub request: RequestInfo,
    pub started_at: DateTime<Utc>,
    started: Instant,
    in_flight_id: Uuid,
}

impl RequestSpan {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn timing(&self) -> Timing {
        Timing {
            start: self.started_at,
            end: Some(Utc::now()),
            duration_ms: Some(self.elapsed().as_secs_f64() * 1000.0),
        }
    }
}

/// Emits structured request/response/error entries
#[derive(Debug, Clone)]
pub struct RequestLogger {
    config: RequestLogConfig,
    logger: Logger,
    in_flight: InFlightRequests,
}

impl RequestLogger {
    /// A request logger writing to `REQUEST_LOG_FILE_PATH` when set, otherwise
    /// wherever the application logger writes
    pub fn new(config: RequestLogConfig, base: &LoggerConfig) -> Self {
        let mut logger_config = base.clone();
        if let Some(ref path) = config.file_path {
            logger_config.file_path = Some(path.clone());
        }
        Self::with_logger(config, Logger::new(logger_config))
    }

    pub fn with_logger(config: RequestLogConfig, logger: Logger) -> Self {
        let in_flight = InFlightRequests::new(Duration::from_secs(config.in_flight_ttl_secs));
        Self {
            config,
            logger,
            in_flight,
        }
    }

    pub fn config(&self) -> &RequestLogConfig {
        &self.config
    }

    pub fn in_flight(&self) -> &InFlightRequests {
        &self.in_flight
    }

    /// Headers as they should appear in the log: empty unless header logging
    /// is on, sensitive values redacted unless sensitive logging is on
    pub fn capture_headers<'a>(
        &self,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> BTreeMap<String, String> {
        if !self.config.log_headers {
            return BTreeMap::new();
        }

        headers
            .into_iter()
            .map(|(name, value)| {
                let name = name.to_ascii_lowercase();
                let value = if !self.config.log_sensitive_data && is_sensitive_header(&name) {
                    REDACTED.to_string()
                } else {
                    value.to_string()
                };
                (name, value)
            })
            .collect()
    }

    /// Body text for the log, redacted and truncated. `None` for empty or binary bodies.
    pub fn capture_body(&self, content_type: Option<&str>, body: &[u8]) -> Option<String> {
        if body.is_empty() || self.config.max_body_size == 0 {
            return None;
        }

        let is_json = content_type.map_or(false, |ct| ct.contains("json"));
        if is_json && !self.config.log_sensitive_data {
            if let Ok(mut value) = serde_json::from_slice::<JsonValue>(body) {
                redact_json(&mut value);
                return Some(truncate_body(&value.to_string(), self.config.max_body_size));
            }
        }

        let text = std::str::from_utf8(body).ok()?;
        Some(truncate_body(text, self.config.max_body_size))
    }

    /// Register the request and log its arrival at debug level
    pub async fn start(
        &self,
        correlation_id: impl Into<String>,
        request: RequestInfo,
    ) -> RequestSpan {
        let correlation_id = correlation_id.into();
        let in_flight_id = self
            .in_flight
            .insert(&correlation_id, &request.method, &request.path)
            .await;

        let span = RequestSpan {
            correlation_id,
            request,
            started_at: Utc::now(),
            started: Instant::now(),
            in_flight_id,
        };

        let entry = self.request_entry(
            LogLevel::Debug,
            format!("--> {} {}", span.request.method, span.request.path),
            &span,
            None,
            Timing {
                start: span.started_at,
                end: None,
                duration_ms: None,
            },
        );
        self.logger.log_entry(entry);

        span
    }

    /// Log the response: info for 1xx-3xx, warn for 4xx, error for 5xx
    pub async fn finish(&self, span: RequestSpan, response: ResponseInfo) -> LogLevel {
        self.in_flight.remove(span.in_flight_id).await;

        let level = match response.status_code {
            500..=u16::MAX => LogLevel::Error,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        };

        let timing = span.timing();
        let message = format!(
            "<-- {} {} {} {:.1}ms",
            span.request.method,
            span.request.path,
            response.status_code,
            timing.duration_ms.unwrap_or_default()
        );
        let entry = self.request_entry(level, message, &span, Some(response), timing);
        self.logger.log_entry(entry);

        level
    }

    /// Log a request that failed before producing a response
    pub async fn fail(&self, span: RequestSpan, err: &(dyn std::error::Error + Send + Sync + 'static)) {
        self.in_flight.remove(span.in_flight_id).await;

        let timing = span.timing();
        let message = format!("<-- {} {} failed: {}", span.request.method, span.request.path, err);
        let mut entry = self.request_entry(LogLevel::Error, message, &span, None, timing);
        entry.error = Some(ErrorDetails::from_error("RequestError", err));
        self.logger.log_entry(entry);
    }

    /// Log and drop requests that outlived the in-flight TTL
    pub async fn sweep_stale(&self) -> usize {
        let expired = self.in_flight.sweep_expired().await;
        for request in &expired {
            self.logger
                .with_correlation_id(request.correlation_id.clone())
                .warn(
                    "request never completed",
                    Some(serde_json::json!({
                        "method": request.method,
                        "path": request.path,
                        "startedAt": request.started_at,
                    })),
                );
        }
        expired.len()
    }

    /// Application logger bound to this request's correlation id
    pub fn logger_for(&self, span: &RequestSpan) -> Logger {
        self.logger
            .with_context(LogContext::new().with_correlation_id(span.correlation_id.clone()))
    }

    fn request_entry(
        &self,
        level: LogLevel,
        message: String,
        span: &RequestSpan,
        response: Option<ResponseInfo>,
        timing: Timing,
    ) -> LogEntry {
        let mut entry = self.logger.build_entry(level, &message, None);
        entry.correlation_id = Some(span.correlation_id.clone());
        entry.kind = EntryKind::Request(RequestRecord {
            request: span.request.clone(),
            response,
            timing: Some(timing),
        });
        entry
    }
}
