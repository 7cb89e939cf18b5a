// File: src/logger.rs
// Purpose: Leveled structured logger writing JSON lines to console and/or file

use serde_json::Value as JsonValue;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::LoggerConfig;
use crate::entry::{ErrorDetails, LogEntry, LogLevel};
use crate::error::{LogError, Result};

/// Destination for encoded log entries
pub trait LogSink: Send + Sync {
    fn write(&self, entry: &LogEntry) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Writes one JSON line per entry to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let line = entry.to_json_line()?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line).map_err(|e| LogError::io("write", "<stdout>", e))
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Appends one JSON line per entry to a file, creating parent directories on demand.
///
/// Each entry is written with a single `write_all` so concurrent appenders
/// interleave whole lines. Rotation racing with an append is not guarded.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let mut line = entry.to_json_line()?;
        line.push('\n');

        // A poisoned lock only means another writer panicked mid-append
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LogError::io("create directory", parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::io("open", &self.path, e))?;

        file.write_all(line.as_bytes())
            .map_err(|e| LogError::io("append to", &self.path, e))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Keeps entries in memory; handy for tests and in-process inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Per-call context attached to every entry a logger writes.
///
/// A context is fixed for the lifetime of the logger it was given to;
/// concurrent requests each derive their own logger instead of sharing
/// a mutable correlation id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    pub correlation_id: Option<String>,
    pub user_id: Option<String>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a fresh random correlation id
    pub fn generate() -> Self {
        Self::new().with_correlation_id(Uuid::new_v4().to_string())
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

struct LoggerInner {
    config: LoggerConfig,
    sinks: Vec<Arc<dyn LogSink>>,
    /// Receives entries a sink failed to write
    fallback: Arc<dyn LogSink>,
}

/// Structured logger. Cheap to clone; clones share sinks.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
    context: LogContext,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("service", &self.inner.config.service)
            .field("level", &self.inner.config.level)
            .field("sinks", &self.inner.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("context", &self.context)
            .finish()
    }
}

impl Logger {
    /// Build a logger with the console and/or file sinks named in the config
    pub fn new(config: LoggerConfig) -> Self {
        let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();

        if config.console {
            sinks.push(Arc::new(ConsoleSink));
        }

        if let Some(ref path) = config.file_path {
            sinks.push(Arc::new(FileSink::new(path.clone())));
        }

        Self::with_sinks(config, sinks)
    }

    /// Explicit sinks; failed writes fall back to the console
    pub fn with_sinks(config: LoggerConfig, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self::with_fallback(config, sinks, Arc::new(ConsoleSink))
    }

    pub fn with_fallback(
        config: LoggerConfig,
        sinks: Vec<Arc<dyn LogSink>>,
        fallback: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                config,
                sinks,
                fallback,
            }),
            context: LogContext::default(),
        }
    }

    /// A logger sharing these sinks whose entries carry `context`
    pub fn with_context(&self, context: LogContext) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            context,
        }
    }

    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        self.with_context(self.context.clone().with_correlation_id(id))
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.enabled_for(self.inner.config.level)
    }

    pub fn debug(&self, message: &str, metadata: Option<JsonValue>) {
        self.log(LogLevel::Debug, message, metadata);
    }

    pub fn info(&self, message: &str, metadata: Option<JsonValue>) {
        self.log(LogLevel::Info, message, metadata);
    }

    pub fn warn(&self, message: &str, metadata: Option<JsonValue>) {
        self.log(LogLevel::Warn, message, metadata);
    }

    pub fn error(&self, message: &str, metadata: Option<JsonValue>) {
        self.log(LogLevel::Error, message, metadata);
    }

    /// Log at error level with the details of `err` attached
    pub fn error_with(
        &self,
        message: &str,
        err: &(dyn std::error::Error + 'static),
        metadata: Option<JsonValue>,
    ) {
        if !self.is_enabled(LogLevel::Error) {
            return;
        }

        let mut entry = self.build_entry(LogLevel::Error, message, metadata);
        entry.error = Some(ErrorDetails::from_error(error_name(err), err));
        self.dispatch(&entry);
    }

    pub fn log(&self, level: LogLevel, message: &str, metadata: Option<JsonValue>) {
        if !self.is_enabled(level) {
            return;
        }

        let entry = self.build_entry(level, message, metadata);
        self.dispatch(&entry);
    }

    /// Write a pre-built entry, filling in service identity and context if unset
    pub fn log_entry(&self, mut entry: LogEntry) {
        if !self.is_enabled(entry.level) {
            return;
        }

        let config = &self.inner.config;
        if entry.service.is_empty() {
            entry.service = config.service.clone();
        }
        entry.version.get_or_insert_with(|| config.version.clone());
        entry.environment.get_or_insert_with(|| config.environment.clone());
        if entry.correlation_id.is_none() {
            entry.correlation_id = self.context.correlation_id.clone();
        }
        if entry.user_id.is_none() {
            entry.user_id = self.context.user_id.clone();
        }

        self.dispatch(&entry);
    }

    /// Build an entry stamped with the current time, config identity and this logger's context
    pub fn build_entry(
        &self,
        level: LogLevel,
        message: &str,
        metadata: Option<JsonValue>,
    ) -> LogEntry {
        let config = &self.inner.config;
        let mut entry = LogEntry::new(level, message, config.service.clone());
        entry.version = Some(config.version.clone());
        entry.environment = Some(config.environment.clone());
        entry.correlation_id = self.context.correlation_id.clone();
        entry.user_id = self.context.user_id.clone();
        entry.metadata = metadata;
        entry
    }

    fn dispatch(&self, entry: &LogEntry) {
        for sink in &self.inner.sinks {
            if let Err(e) = sink.write(entry) {
                let fallback = &self.inner.fallback;
                tracing::warn!(
                    sink = sink.name(),
                    fallback = fallback.name(),
                    error = %e,
                    "log sink write failed"
                );
                if sink.name() != fallback.name() {
                    let _ = fallback.write(entry);
                }
            }
        }
    }
}

fn error_name(err: &(dyn std::error::Error + 'static)) -> &'static str {
    if err.is::<std::io::Error>() {
        "IoError"
    } else if err.is::<serde_json::Error>() {
        "JsonError"
    } else if err.is::<LogError>() {
        "LogError"
    } else {
        "Error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_logger(level: LogLevel) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let config = LoggerConfig {
            level,
            console: false,
            ..LoggerConfig::default()
        };
        (Logger::with_sinks(config, vec![sink.clone() as Arc<dyn LogSink>]), sink)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, sink) = memory_logger(LogLevel::Warn);

        logger.debug("noise", None);
        logger.info("still noise", None);
        logger.warn("disk almost full", None);
        logger.error("disk full", None);

        let levels: Vec<LogLevel> = sink.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn test_entry_carries_identity_and_metadata() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        logger.info("room created", Some(json!({ "roomId": "!abc:example.org" })));

        let entry = &sink.entries()[0];
        assert_eq!(entry.service, "melo");
        assert_eq!(entry.environment.as_deref(), Some("development"));
        assert_eq!(entry.metadata.as_ref().unwrap()["roomId"], "!abc:example.org");
        assert!(entry.correlation_id.is_none());
    }

    #[test]
    fn test_context_is_scoped_per_logger() {
        let (logger, sink) = memory_logger(LogLevel::Debug);
        let first = logger.with_correlation_id("req-1");
        let second = logger.with_context(
            LogContext::new()
                .with_correlation_id("req-2")
                .with_user_id("@bob:example.org"),
        );

        first.info("a", None);
        second.info("b", None);
        logger.info("c", None);

        let ids: Vec<Option<String>> = sink.entries().into_iter().map(|e| e.correlation_id).collect();
        assert_eq!(ids, vec![Some("req-1".to_string()), Some("req-2".to_string()), None]);
        assert_eq!(sink.entries()[1].user_id.as_deref(), Some("@bob:example.org"));
    }

    #[test]
    fn test_error_with_attaches_details() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only filesystem");
        logger.error_with("could not persist draft", &err, None);

        let entry = &sink.entries()[0];
        let details = entry.error.as_ref().unwrap();
        assert_eq!(details.name, "IoError");
        assert_eq!(details.message, "read-only filesystem");
    }

    #[test]
    fn test_file_sink_creates_directories_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/app.log");
        let config = LoggerConfig {
            console: false,
            file_path: Some(path.clone()),
            ..LoggerConfig::default()
        };
        let logger = Logger::new(config);

        logger.info("first", None);
        logger.info("second", None);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: LogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.message, "second");
    }

    #[test]
    fn test_file_failure_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every open fail
        let path = dir.path().join("app.log");
        fs::create_dir_all(&path).unwrap();

        let sink = FileSink::new(&path);
        let entry = LogEntry::new(LogLevel::Info, "lost", "melo");
        assert!(sink.write(&entry).is_err());

        let config = LoggerConfig {
            console: false,
            file_path: Some(path),
            ..LoggerConfig::default()
        };
        Logger::new(config).info("falls back to console", None);
    }

    #[test]
    fn test_failed_file_write_reaches_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::create_dir_all(&path).unwrap();

        let healthy = Arc::new(MemorySink::new());
        let fallback = Arc::new(MemorySink::new());
        let config = LoggerConfig {
            console: false,
            ..LoggerConfig::default()
        };
        let sinks: Vec<Arc<dyn LogSink>> = vec![Arc::new(FileSink::new(&path)), healthy.clone()];
        let logger = Logger::with_fallback(config, sinks, fallback.clone());

        logger.warn("disk unavailable", None);

        let rescued = fallback.entries();
        assert_eq!(rescued.len(), 1);
        assert_eq!(rescued[0].message, "disk unavailable");
        assert_eq!(healthy.len(), 1);
    }

    #[test]
    fn test_fallback_not_used_when_sinks_succeed() {
        let sink = Arc::new(MemorySink::new());
        let fallback = Arc::new(MemorySink::new());
        let config = LoggerConfig {
            console: false,
            ..LoggerConfig::default()
        };
        let sinks: Vec<Arc<dyn LogSink>> = vec![sink.clone()];
        let logger = Logger::with_fallback(config, sinks, fallback.clone());

        logger.info("ok", None);
        assert_eq!(sink.len(), 1);
        assert!(fallback.is_empty());
    }
}
