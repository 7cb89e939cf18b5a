// File: src/error.rs
// Purpose: Errors raised by the push handler and its capabilities

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push event carried no payload")]
    EmptyPayload,

    #[error("invalid push payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to display notification: {0}")]
    Display(String),

    #[error("client window operation failed: {0}")]
    Client(String),

    #[error("push subscription failed: {0}")]
    Subscribe(String),

    #[error("no VAPID public key configured")]
    MissingVapidKey,

    #[error("subscription registration failed: {0}")]
    Register(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PushError>;
