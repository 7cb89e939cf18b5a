//! Push payload schema
//!
//! A push message body looks like:
//!
//! ```json
//! { "notification": { "title": "Alice", "body": "hi", "data": { "roomId": "!abc:melo.chat" } } }
//! ```
//!
//! Every field is optional; missing ones are filled from
//! [`NotificationDefaults`](crate::options::NotificationDefaults).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PushError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub notification: NotificationPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    pub data: Option<NotificationData>,
    pub actions: Option<Vec<NotificationAction>>,
    pub require_interaction: Option<bool>,
    pub silent: Option<bool>,
    pub vibrate: Option<Vec<u32>>,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
    pub image: Option<String>,
}

/// Deep-link data attached to a notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Anything else the sender attached
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotificationData {
    pub fn room(room_id: impl Into<String>) -> Self {
        Self {
            room_id: Some(room_id.into()),
            ..Self::default()
        }
    }

    pub fn with_event(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
            icon: None,
        }
    }
}

/// Decode the body of a push event
pub fn parse_payload(data: &[u8]) -> Result<PushPayload> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(PushError::EmptyPayload);
    }
    Ok(serde_json::from_slice(data)?)
}
