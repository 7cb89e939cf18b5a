// File: src/messages.rs
// Purpose: Messages exchanged between open pages and the push handler

use serde::{Deserialize, Serialize};

use crate::capability::Permission;

/// A message posted to the worker by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    #[serde(rename_all = "camelCase")]
    SetUserInfo {
        user_id: String,
        #[serde(default)]
        display_name: Option<String>,
    },
    ShowTestNotification,
    GetNotificationPermission,
}

/// Reply sent back on the message port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageReply {
    NotificationPermission { permission: Permission },
}

/// The signed-in user, as announced by `SET_USER_INFO`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub display_name: Option<String>,
}
