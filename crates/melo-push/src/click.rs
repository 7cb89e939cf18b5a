// File: src/click.rs
// Purpose: Deep-link resolution for notification clicks

use serde::Serialize;

use crate::payload::NotificationData;

/// What a notification click ended up doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ClickOutcome {
    Dismissed,
    Focused { client_id: String, navigated: bool },
    Opened { url: String },
}

/// A click (or close) on a displayed notification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationEvent {
    /// Action button identifier; `None` for a click on the body
    pub action: Option<String>,
    pub tag: Option<String>,
    pub data: NotificationData,
}

impl NotificationEvent {
    pub fn new(data: NotificationData) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Path a notification should open: explicit `url`, else the room (and event), else `/`
pub fn target_url(data: &NotificationData) -> String {
    if let Some(url) = data.url.as_deref().filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    match data.room_id.as_deref().filter(|r| !r.is_empty()) {
        Some(room) => {
            let mut path = format!("/rooms/{}", urlencoding::encode(room));
            if let Some(event) = data.event_id.as_deref().filter(|e| !e.is_empty()) {
                path.push_str("?event=");
                path.push_str(&urlencoding::encode(event));
            }
            path
        }
        None => "/".to_string(),
    }
}

/// Offset of `://` when it ends a well-formed scheme at the start of `url`
fn scheme_end(url: &str) -> Option<usize> {
    let end = url.find("://")?;
    let mut scheme = url[..end].chars();
    let first_ok = scheme.next().is_some_and(|c| c.is_ascii_alphabetic());
    if first_ok && scheme.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(end)
    } else {
        None
    }
}

/// Resolve a path against the origin; absolute URLs pass through
pub fn absolute_url(origin: &str, url: &str) -> String {
    if scheme_end(url).is_some() {
        return url.to_string();
    }

    let origin = origin.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", origin, url)
    } else {
        format!("{}/{}", origin, url)
    }
}

/// `scheme://host[:port]` part of a URL
pub fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = scheme_end(url)?;
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    if host_end == 0 {
        return None;
    }
    Some(&url[..scheme_end + 3 + host_end])
}

pub fn same_origin(url: &str, origin: &str) -> bool {
    match origin_of(url) {
        Some(o) => o.eq_ignore_ascii_case(origin.trim_end_matches('/')),
        None => false,
    }
}
