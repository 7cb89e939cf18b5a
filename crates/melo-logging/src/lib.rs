//! # melo-logging
//!
//! Structured logging for Melo services.
//!
//! - [`Logger`]: leveled JSON-lines logger writing to console and/or file,
//!   with per-logger [`LogContext`] (correlation id, user id)
//! - [`LogFileManager`]: size-based rotation with gzip, retention by count,
//!   and filtered queries/statistics over the accumulated files
//! - [`RequestLogger`]: request/response entries with correlation ids,
//!   header and body redaction, and a TTL-bounded in-flight registry
//!
//! ## Example
//!
//! ```rust,no_run
//! use melo_logging::{LoggingConfig, Logger, LogQuery, LogLevel, LogFileManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = LoggingConfig::load("melo.toml")?.with_env()?;
//! let logger = Logger::new(config.logger.clone());
//! logger.with_correlation_id("req-42").info("room joined", None);
//!
//! let manager = LogFileManager::new(config.rotation.clone());
//! manager.rotate().await?;
//! let errors = manager.query(&LogQuery::new().level(LogLevel::Error)).await?;
//! println!("{} errors", errors.total);
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod config;
pub mod entry;
pub mod error;
pub mod logger;
pub mod manager;
pub mod query;
pub mod request;
pub mod size;

pub use config::{LoggerConfig, LoggingConfig, RequestLogConfig, RotationConfig};
pub use entry::{
    EntryKind, ErrorDetails, LogEntry, LogLevel, RequestInfo, RequestRecord, ResponseInfo, Timing,
};
pub use error::LogError;
pub use logger::{ConsoleSink, FileSink, LogContext, LogSink, Logger, MemorySink};
pub use manager::{LogFileManager, LogFileMetadata};
pub use query::{CountedItem, LogQuery, LogStats, QueryResult};
pub use request::{
    correlation_id_from, InFlightRequest, InFlightRequests, RequestLogger, RequestSpan,
    CORRELATION_ID_HEADER, REQUEST_ID_HEADER,
};
pub use size::{format_size, parse_size, SizeParseError};
