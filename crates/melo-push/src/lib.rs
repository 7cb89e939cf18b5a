//! # melo-push
//!
//! Push notification handling for the Melo web client.
//!
//! Incoming push payloads are decoded and rendered with defaults for every
//! missing field. Clicks are routed to the room or event they point at,
//! reusing an open window of the same origin when there is one. Platform
//! access goes through the traits in [`capability`], so the routing logic runs
//! anywhere.

pub mod capability;
pub mod click;
pub mod config;
pub mod error;
pub mod handler;
pub mod messages;
pub mod options;
pub mod payload;

pub use capability::{
    ClientWindows, HttpSubscriptionEndpoint, NotificationSink, Permission, PushManager, PushSubscription,
    SubscriptionEndpoint, SubscriptionKeys, WindowClient,
};
pub use click::{target_url, ClickOutcome, NotificationEvent};
pub use config::PushConfig;
pub use error::{PushError, Result};
pub use handler::PushHandler;
pub use messages::{MessageReply, UserInfo, WorkerMessage};
pub use options::{NotificationDefaults, NotificationOptions};
pub use payload::{parse_payload, NotificationAction, NotificationData, NotificationPayload, PushPayload};
