// File: src/options.rs
// Purpose: Turn a push payload into fully populated notification options

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::payload::{NotificationAction, NotificationData, NotificationPayload};

pub const OPEN_ACTION: &str = "open";
pub const DISMISS_ACTION: &str = "dismiss";

/// Values used for every field a payload leaves out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_body")]
    pub body: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_badge")]
    pub badge: String,

    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    #[serde(default = "default_actions")]
    pub actions: Vec<NotificationAction>,
}

fn default_title() -> String {
    "New Message".to_string()
}

fn default_body() -> String {
    "You have a new message".to_string()
}

fn default_icon() -> String {
    "/icons/icon-192x192.png".to_string()
}

fn default_badge() -> String {
    "/icons/badge-72x72.png".to_string()
}

fn default_tag() -> String {
    "melo-message".to_string()
}

fn default_vibrate() -> Vec<u32> {
    vec![200, 100, 200]
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction::new(OPEN_ACTION, "Open"),
        NotificationAction::new(DISMISS_ACTION, "Dismiss"),
    ]
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: default_title(),
            body: default_body(),
            icon: default_icon(),
            badge: default_badge(),
            tag: default_tag(),
            vibrate: default_vibrate(),
            actions: default_actions(),
        }
    }
}

/// A notification ready to hand to the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
    pub require_interaction: bool,
    pub silent: bool,
    pub vibrate: Vec<u32>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NotificationOptions {
    pub fn build(payload: &NotificationPayload, defaults: &NotificationDefaults) -> Self {
        Self {
            title: payload.title.clone().unwrap_or_else(|| defaults.title.clone()),
            body: payload.body.clone().unwrap_or_else(|| defaults.body.clone()),
            icon: payload.icon.clone().unwrap_or_else(|| defaults.icon.clone()),
            badge: payload.badge.clone().unwrap_or_else(|| defaults.badge.clone()),
            tag: payload.tag.clone().unwrap_or_else(|| defaults.tag.clone()),
            data: payload.data.clone().unwrap_or_default(),
            actions: payload.actions.clone().unwrap_or_else(|| defaults.actions.clone()),
            require_interaction: payload.require_interaction.unwrap_or(false),
            silent: payload.silent.unwrap_or(false),
            vibrate: payload.vibrate.clone().unwrap_or_else(|| defaults.vibrate.clone()),
            timestamp: payload.timestamp.unwrap_or_else(|| Utc::now().timestamp_millis()),
            image: payload.image.clone(),
        }
    }

    /// Generic notification shown when a payload cannot be decoded
    pub fn fallback(defaults: &NotificationDefaults) -> Self {
        Self::build(&NotificationPayload::default(), defaults)
    }
}
