//! Push event routing
//!
//! [`PushHandler`] reacts to the worker lifecycle events that concern push:
//! an incoming push, a click or close on a notification, a push subscription
//! being rotated by the browser, and messages from open pages.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::capability::{
    ClientWindows, NotificationSink, Permission, PushManager, PushSubscription, SubscriptionEndpoint,
};
use crate::click::{absolute_url, same_origin, target_url, ClickOutcome, NotificationEvent};
use crate::config::PushConfig;
use crate::error::{PushError, Result};
use crate::messages::{MessageReply, UserInfo, WorkerMessage};
use crate::options::{NotificationOptions, DISMISS_ACTION};
use crate::payload::{parse_payload, NotificationData, NotificationPayload};

const TEST_NOTIFICATION_TAG: &str = "melo-test";

pub struct PushHandler {
    config: PushConfig,
    notifications: Arc<dyn NotificationSink>,
    windows: Arc<dyn ClientWindows>,
    push_manager: Option<Arc<dyn PushManager>>,
    endpoint: Option<Arc<dyn SubscriptionEndpoint>>,
    user: Arc<RwLock<Option<UserInfo>>>,
}

impl PushHandler {
    pub fn new(
        config: PushConfig,
        notifications: Arc<dyn NotificationSink>,
        windows: Arc<dyn ClientWindows>,
    ) -> Self {
        Self {
            config,
            notifications,
            windows,
            push_manager: None,
            endpoint: None,
            user: Arc::new(RwLock::new(None)),
        }
    }

    /// Enable subscription renewal
    pub fn with_subscriptions(
        mut self,
        push_manager: Arc<dyn PushManager>,
        endpoint: Arc<dyn SubscriptionEndpoint>,
    ) -> Self {
        self.push_manager = Some(push_manager);
        self.endpoint = Some(endpoint);
        self
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    pub async fn user(&self) -> Option<UserInfo> {
        self.user.read().await.clone()
    }

    /// Display a notification for a push event.
    ///
    /// A missing or undecodable payload still produces the generic notification.
    pub async fn on_push(&self, data: Option<&[u8]>) -> Result<NotificationOptions> {
        let payload = match data.map(parse_payload) {
            Some(Ok(payload)) => Some(payload),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "falling back to generic notification");
                None
            }
            None => None,
        };

        let mut options = match payload {
            Some(payload) => NotificationOptions::build(&payload.notification, &self.config.defaults),
            None => NotificationOptions::fallback(&self.config.defaults),
        };
        self.tag_with_user(&mut options.data).await;

        self.notifications.show(&options).await?;
        tracing::debug!(title = %options.title, tag = %options.tag, "notification shown");

        Ok(options)
    }

    /// Route a notification click to an existing window or a new one
    pub async fn on_notification_click(&self, event: &NotificationEvent) -> Result<ClickOutcome> {
        if event.action.as_deref() == Some(DISMISS_ACTION) {
            tracing::debug!(tag = ?event.tag, "notification dismissed");
            return Ok(ClickOutcome::Dismissed);
        }

        let url = absolute_url(&self.config.origin, &target_url(&event.data));

        let clients = self.windows.match_all().await?;
        let existing = clients
            .iter()
            .filter(|c| same_origin(&c.url, &self.config.origin))
            .max_by_key(|c| c.focused);

        if let Some(client) = existing {
            self.windows.focus(&client.id).await?;

            let navigated = client.url != url;
            if navigated {
                self.windows.navigate(&client.id, &url).await?;
            }

            tracing::debug!(client = %client.id, url = %url, navigated, "focused existing window");
            return Ok(ClickOutcome::Focused {
                client_id: client.id.clone(),
                navigated,
            });
        }

        self.windows.open_window(&url).await?;
        tracing::debug!(url = %url, "opened new window");
        Ok(ClickOutcome::Opened { url })
    }

    pub fn on_notification_close(&self, event: &NotificationEvent) {
        tracing::debug!(tag = ?event.tag, room = ?event.data.room_id, "notification closed");
    }

    /// Resubscribe after the push service rotated the subscription.
    ///
    /// Failures are logged and swallowed; nothing is retried.
    pub async fn on_subscription_change(&self) -> Option<PushSubscription> {
        match self.renew_subscription().await {
            Ok(subscription) => {
                tracing::info!(endpoint = %subscription.endpoint, "push subscription renewed");
                Some(subscription)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to renew push subscription");
                None
            }
        }
    }

    async fn renew_subscription(&self) -> Result<PushSubscription> {
        let (push_manager, endpoint) = match (&self.push_manager, &self.endpoint) {
            (Some(p), Some(e)) => (p, e),
            _ => return Err(PushError::Subscribe("subscription renewal not configured".to_string())),
        };

        if self.config.vapid_public_key.is_empty() {
            return Err(PushError::MissingVapidKey);
        }

        let subscription = push_manager.subscribe(&self.config.vapid_public_key).await?;
        endpoint.register(&subscription).await?;
        Ok(subscription)
    }

    /// Handle a message posted by a page; some messages expect a reply
    pub async fn on_message(&self, message: WorkerMessage) -> Result<Option<MessageReply>> {
        match message {
            WorkerMessage::SetUserInfo { user_id, display_name } => {
                tracing::debug!(user_id = %user_id, "user info updated");
                *self.user.write().await = Some(UserInfo { user_id, display_name });
                Ok(None)
            }
            WorkerMessage::ShowTestNotification => {
                let payload = NotificationPayload {
                    title: Some("Test Notification".to_string()),
                    body: Some("Push notifications are working".to_string()),
                    tag: Some(TEST_NOTIFICATION_TAG.to_string()),
                    ..NotificationPayload::default()
                };
                let mut options = NotificationOptions::build(&payload, &self.config.defaults);
                self.tag_with_user(&mut options.data).await;
                self.notifications.show(&options).await?;
                Ok(None)
            }
            WorkerMessage::GetNotificationPermission => {
                let permission: Permission = self.notifications.permission().await;
                Ok(Some(MessageReply::NotificationPermission { permission }))
            }
        }
    }

    async fn tag_with_user(&self, data: &mut NotificationData) {
        if let Some(user) = self.user.read().await.as_ref() {
            data.extra
                .entry("userId")
                .or_insert_with(|| Value::from(user.user_id.clone()));
        }
    }
}
