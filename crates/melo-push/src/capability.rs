//! Platform capabilities the push handler drives
//!
//! The handler never talks to a browser or OS directly. Whatever hosts it
//! supplies these traits: a notification surface, the set of open client
//! windows, the push service, and the server endpoint that stores
//! subscriptions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::options::NotificationOptions;

/// Notification permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    #[default]
    Default,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Default => "default",
        };
        f.write_str(s)
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, options: &NotificationOptions) -> Result<()>;

    async fn permission(&self) -> Permission;
}

/// An open window controlled by this origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

#[async_trait]
pub trait ClientWindows: Send + Sync {
    /// All window clients, including uncontrolled ones
    async fn match_all(&self) -> Result<Vec<WindowClient>>;

    async fn focus(&self, id: &str) -> Result<()>;

    async fn navigate(&self, id: &str, url: &str) -> Result<()>;

    async fn open_window(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A push service subscription as returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[async_trait]
pub trait PushManager: Send + Sync {
    /// Subscribe with user-visible-only notifications and the given VAPID key
    async fn subscribe(&self, application_server_key: &str) -> Result<PushSubscription>;
}

#[async_trait]
pub trait SubscriptionEndpoint: Send + Sync {
    async fn register(&self, subscription: &PushSubscription) -> Result<()>;
}

/// Registers subscriptions by POSTing them as JSON
#[derive(Debug, Clone)]
pub struct HttpSubscriptionEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpSubscriptionEndpoint {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SubscriptionEndpoint for HttpSubscriptionEndpoint {
    async fn register(&self, subscription: &PushSubscription) -> Result<()> {
        self.client
            .post(&self.url)
            .json(subscription)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(url = %self.url, "push subscription registered");
        Ok(())
    }
}
