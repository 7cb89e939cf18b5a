// File: src/error.rs
// Purpose: Error types shared by the logger, the file manager and config loading

use std::path::PathBuf;
use thiserror::Error;

use crate::size::SizeParseError;

/// Errors surfaced by the logging crate
#[derive(Debug, Error)]
pub enum LogError {
    #[error(transparent)]
    Size(#[from] SizeParseError),

    #[error("unknown log level '{0}' (expected debug, info, warn or error)")]
    InvalidLevel(String),

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LogError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        LogError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LogError>;
