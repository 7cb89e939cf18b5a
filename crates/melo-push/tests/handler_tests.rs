//! Push handler behaviour against recording fakes

use async_trait::async_trait;
use melo_push::*;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<NotificationOptions>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, options: &NotificationOptions) -> Result<()> {
        self.shown.lock().unwrap().push(options.clone());
        Ok(())
    }

    async fn permission(&self) -> Permission {
        Permission::Granted
    }
}

#[derive(Debug, Clone, PartialEq)]
enum WindowCall {
    Focus(String),
    Navigate(String, String),
    Open(String),
}

#[derive(Default)]
struct FakeWindows {
    clients: Vec<WindowClient>,
    calls: Mutex<Vec<WindowCall>>,
}

impl FakeWindows {
    fn with_clients(clients: Vec<WindowClient>) -> Self {
        Self {
            clients,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<WindowCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientWindows for FakeWindows {
    async fn match_all(&self) -> Result<Vec<WindowClient>> {
        Ok(self.clients.clone())
    }

    async fn focus(&self, id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(WindowCall::Focus(id.to_string()));
        Ok(())
    }

    async fn navigate(&self, id: &str, url: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(WindowCall::Navigate(id.to_string(), url.to_string()));
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        self.calls.lock().unwrap().push(WindowCall::Open(url.to_string()));
        Ok(())
    }
}

struct FakePushManager {
    fail: bool,
}

#[async_trait]
impl PushManager for FakePushManager {
    async fn subscribe(&self, application_server_key: &str) -> Result<PushSubscription> {
        if self.fail {
            return Err(PushError::Subscribe("push service unavailable".to_string()));
        }
        Ok(PushSubscription {
            endpoint: format!("https://push.example/{}", application_server_key),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
        })
    }
}

#[derive(Default)]
struct RecordingEndpoint {
    registered: Mutex<Vec<PushSubscription>>,
}

#[async_trait]
impl SubscriptionEndpoint for RecordingEndpoint {
    async fn register(&self, subscription: &PushSubscription) -> Result<()> {
        self.registered.lock().unwrap().push(subscription.clone());
        Ok(())
    }
}

fn config() -> PushConfig {
    PushConfig {
        origin: "https://melo.chat".to_string(),
        vapid_public_key: "BKey".to_string(),
        ..PushConfig::default()
    }
}

fn window(id: &str, url: &str, focused: bool) -> WindowClient {
    WindowClient {
        id: id.to_string(),
        url: url.to_string(),
        focused,
    }
}

#[tokio::test]
async fn test_malformed_payload_shows_fallback() {
    let sink = Arc::new(RecordingSink::default());
    let handler = PushHandler::new(config(), sink.clone(), Arc::new(FakeWindows::default()));

    handler.on_push(Some(&b"{not json"[..])).await.unwrap();

    let shown = sink.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "New Message");
    assert_eq!(shown[0].body, "You have a new message");
}

#[tokio::test]
async fn test_missing_payload_shows_fallback() {
    let sink = Arc::new(RecordingSink::default());
    let handler = PushHandler::new(config(), sink.clone(), Arc::new(FakeWindows::default()));

    let options = handler.on_push(None).await.unwrap();
    assert_eq!(options.title, "New Message");
    assert_eq!(sink.shown.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_payload_is_rendered() {
    let sink = Arc::new(RecordingSink::default());
    let handler = PushHandler::new(config(), sink.clone(), Arc::new(FakeWindows::default()));

    let raw = br#"{"notification":{"title":"Alice","body":"lunch?","data":{"roomId":"!r:melo.chat"}}}"#;
    let options = handler.on_push(Some(&raw[..])).await.unwrap();

    assert_eq!(options.title, "Alice");
    assert_eq!(options.body, "lunch?");
    assert_eq!(options.tag, "melo-message");
    assert_eq!(options.data.room_id.as_deref(), Some("!r:melo.chat"));
}

#[tokio::test]
async fn test_dismiss_never_opens_window() {
    let windows = Arc::new(FakeWindows::default());
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), windows.clone());

    let event = NotificationEvent::new(NotificationData::room("!r:melo.chat")).with_action("dismiss");
    let outcome = handler.on_notification_click(&event).await.unwrap();

    assert_eq!(outcome, ClickOutcome::Dismissed);
    assert!(windows.calls().is_empty());
}

#[tokio::test]
async fn test_click_focuses_and_navigates_existing_window() {
    let windows = Arc::new(FakeWindows::with_clients(vec![
        window("other", "https://elsewhere.org/", true),
        window("tab-1", "https://melo.chat/rooms/lobby", false),
    ]));
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), windows.clone());

    let event = NotificationEvent::new(NotificationData::room("general").with_event("ev1"));
    let outcome = handler.on_notification_click(&event).await.unwrap();

    assert_eq!(
        outcome,
        ClickOutcome::Focused {
            client_id: "tab-1".to_string(),
            navigated: true,
        }
    );
    assert_eq!(
        windows.calls(),
        vec![
            WindowCall::Focus("tab-1".to_string()),
            WindowCall::Navigate("tab-1".to_string(), "https://melo.chat/rooms/general?event=ev1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_click_on_window_already_at_target_only_focuses() {
    let windows = Arc::new(FakeWindows::with_clients(vec![window(
        "tab-1",
        "https://melo.chat/rooms/general",
        true,
    )]));
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), windows.clone());

    let event = NotificationEvent::new(NotificationData::room("general")).with_action("open");
    let outcome = handler.on_notification_click(&event).await.unwrap();

    assert_eq!(
        outcome,
        ClickOutcome::Focused {
            client_id: "tab-1".to_string(),
            navigated: false,
        }
    );
    assert_eq!(windows.calls(), vec![WindowCall::Focus("tab-1".to_string())]);
}

#[tokio::test]
async fn test_click_opens_window_when_none_match() {
    let windows = Arc::new(FakeWindows::with_clients(vec![window("x", "https://elsewhere.org/", true)]));
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), windows.clone());

    let outcome = handler
        .on_notification_click(&NotificationEvent::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ClickOutcome::Opened {
            url: "https://melo.chat/".to_string()
        }
    );
    assert_eq!(windows.calls(), vec![WindowCall::Open("https://melo.chat/".to_string())]);
}

#[tokio::test]
async fn test_subscription_change_registers_new_subscription() {
    let endpoint = Arc::new(RecordingEndpoint::default());
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), Arc::new(FakeWindows::default()))
        .with_subscriptions(Arc::new(FakePushManager { fail: false }), endpoint.clone());

    let subscription = handler.on_subscription_change().await.unwrap();

    assert_eq!(subscription.endpoint, "https://push.example/BKey");
    assert_eq!(endpoint.registered.lock().unwrap().as_slice(), &[subscription]);
}

#[tokio::test]
async fn test_subscription_change_failure_is_swallowed() {
    let endpoint = Arc::new(RecordingEndpoint::default());
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), Arc::new(FakeWindows::default()))
        .with_subscriptions(Arc::new(FakePushManager { fail: true }), endpoint.clone());

    assert!(handler.on_subscription_change().await.is_none());
    assert!(endpoint.registered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_subscription_change_without_capabilities() {
    let handler = PushHandler::new(config(), Arc::new(RecordingSink::default()), Arc::new(FakeWindows::default()));
    assert!(handler.on_subscription_change().await.is_none());
}

#[tokio::test]
async fn test_messages() {
    let sink = Arc::new(RecordingSink::default());
    let handler = PushHandler::new(config(), sink.clone(), Arc::new(FakeWindows::default()));

    let reply = handler
        .on_message(WorkerMessage::GetNotificationPermission)
        .await
        .unwrap();
    assert_eq!(
        reply,
        Some(MessageReply::NotificationPermission {
            permission: Permission::Granted
        })
    );

    handler
        .on_message(WorkerMessage::SetUserInfo {
            user_id: "@alice:melo.chat".to_string(),
            display_name: None,
        })
        .await
        .unwrap();
    assert_eq!(handler.user().await.unwrap().user_id, "@alice:melo.chat");

    handler.on_message(WorkerMessage::ShowTestNotification).await.unwrap();
    let options = handler.on_push(None).await.unwrap();

    let shown = sink.shown.lock().unwrap();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].title, "Test Notification");
    assert_eq!(
        options.data.extra.get("userId"),
        Some(&serde_json::Value::from("@alice:melo.chat"))
    );
}
