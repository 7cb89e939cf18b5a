use chrono::{DateTime, Utc};
use melo_logging::{LogFileManager, Logger, LoggingConfig, RequestLogger};
use melo_push::PushSubscription;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A push subscription as last registered by a client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubscription {
    pub subscription: PushSubscription,
    pub correlation_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub logger: Logger,
    pub request_logger: RequestLogger,
    pub log_files: Arc<LogFileManager>,
    /// Latest subscription per push endpoint
    pub subscriptions: Arc<RwLock<HashMap<String, StoredSubscription>>>,
}

impl AppState {
    pub fn new(config: &LoggingConfig) -> Self {
        let logger = Logger::new(config.logger.clone());
        let request_logger = RequestLogger::new(config.request.clone(), &config.logger);
        Self::with_loggers(config, logger, request_logger)
    }

    /// State with caller-provided loggers, e.g. ones writing to memory
    pub fn with_loggers(
        config: &LoggingConfig,
        logger: Logger,
        request_logger: RequestLogger,
    ) -> Self {
        Self {
            logger,
            request_logger,
            log_files: Arc::new(LogFileManager::new(config.rotation.clone())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
