//! Integration tests for LogFileManager: rotation, retention and querying
//! against a real temporary log directory.

use chrono::{TimeZone, Utc};
use melo_logging::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn manager(dir: &Path, max_files: usize, max_size: u64, compress: bool) -> LogFileManager {
    LogFileManager::new(RotationConfig {
        directory: dir.to_path_buf(),
        max_size,
        max_files,
        compress,
        interval_secs: 3600,
    })
}

fn entry(minute: u32, level: LogLevel, message: &str) -> LogEntry {
    let mut entry = LogEntry::new(level, message, "melo");
    entry.timestamp = Utc.with_ymd_and_hms(2026, 10, 16, 9, minute, 0).unwrap();
    entry
}

fn write_entries(path: &Path, entries: &[LogEntry]) {
    let lines: Vec<String> = entries.iter().map(|e| e.to_json_line().unwrap()).collect();
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

fn set_age(path: &Path, seconds_ago: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(seconds_ago))
        .unwrap();
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_cleanup_removes_exactly_the_oldest_file() {
    let dir = TempDir::new().unwrap();
    for (name, age) in [("a.log", 300), ("b.log", 200), ("c.log", 100)] {
        let path = dir.path().join(name);
        fs::write(&path, "").unwrap();
        set_age(&path, age);
    }

    let manager = manager(dir.path(), 2, 1024, false);
    let removed = manager.cleanup().await.unwrap();

    assert_eq!(names(&removed), vec!["a.log"]);
    assert!(!dir.path().join("a.log").exists());
    assert!(dir.path().join("b.log").exists());
    assert!(dir.path().join("c.log").exists());
}

#[tokio::test]
async fn test_cleanup_within_budget_is_noop() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), "").unwrap();

    let removed = manager(dir.path(), 5, 1024, false).cleanup().await.unwrap();
    assert!(removed.is_empty());
}

#[tokio::test]
async fn test_list_files_ignores_other_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.log"), "x").unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let files = manager(dir.path(), 5, 1024, false).list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name(), "app.log");
    assert_eq!(files[0].size, 1);
    assert!(!files[0].compressed);
}

#[tokio::test]
async fn test_rotate_compresses_oversized_files() {
    let dir = TempDir::new().unwrap();
    let big = dir.path().join("app.log");
    let small = dir.path().join("requests.log");

    let many: Vec<LogEntry> = (0..50).map(|m| entry(m % 60, LogLevel::Info, "tick")).collect();
    write_entries(&big, &many);
    write_entries(&small, &[entry(0, LogLevel::Info, "one")]);

    let manager = manager(dir.path(), 10, 1024, true);
    let rotated = manager.rotate().await.unwrap();

    assert_eq!(rotated.len(), 1);
    let rotated_name = rotated[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(rotated_name.starts_with("app."));
    assert!(rotated_name.ends_with(".log.gz"));
    assert!(!big.exists());
    assert!(small.exists());

    // Rotated entries stay queryable through the gzip layer
    let result = manager.query(&LogQuery::new().search("tick")).await.unwrap();
    assert_eq!(result.total, 50);
}

#[tokio::test]
async fn test_rotate_without_compression_keeps_plain_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "x".repeat(2048)).unwrap();

    let rotated = manager(dir.path(), 10, 1024, false).rotate().await.unwrap();
    assert_eq!(rotated.len(), 1);
    assert!(names(&rotated)[0].ends_with(".log"));
    assert!(rotated[0].exists());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_query_level_across_files_newest_first() {
    let dir = TempDir::new().unwrap();
    write_entries(
        &dir.path().join("app.log"),
        &[entry(1, LogLevel::Error, "db timeout"), entry(2, LogLevel::Info, "ok")],
    );
    write_entries(
        &dir.path().join("worker.log"),
        &[entry(5, LogLevel::Error, "push failed"), entry(3, LogLevel::Warn, "slow")],
    );
    fs::write(dir.path().join("broken.log"), "not json\n{\"half\":\n").unwrap();

    let manager = manager(dir.path(), 10, 1024 * 1024, false);
    let result = manager.query(&LogQuery::new().level(LogLevel::Error)).await.unwrap();

    assert_eq!(result.total, 2);
    assert!(result.entries.iter().all(|e| e.level == LogLevel::Error));
    assert_eq!(result.entries[0].message, "push failed");
    assert_eq!(result.entries[1].message, "db timeout");
}

#[tokio::test]
async fn test_query_missing_directory_is_empty() {
    let manager = manager(Path::new("/nonexistent/melo-logs"), 5, 1024, false);
    let result = manager.query(&LogQuery::new()).await.unwrap();
    assert_eq!(result.total, 0);
}

#[tokio::test]
async fn test_directory_that_is_a_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("app.log");
    File::create(&not_a_dir).unwrap();

    let manager = manager(&not_a_dir, 5, 1024, false);
    let err = manager.list_files().await.unwrap_err();
    assert!(err.to_string().contains("not a directory"));

    assert!(manager.query(&LogQuery::new()).await.is_err());
    assert!(manager.stats().await.is_err());
    assert!(manager.rotate().await.is_err());
}

#[tokio::test]
async fn test_stats_over_directory() {
    let dir = TempDir::new().unwrap();
    write_entries(
        &dir.path().join("app.log"),
        &[
            entry(1, LogLevel::Error, "sync failed"),
            entry(2, LogLevel::Error, "sync failed"),
            entry(3, LogLevel::Info, "ok"),
        ],
    );

    let stats = manager(dir.path(), 10, 1024 * 1024, false).stats().await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.count(LogLevel::Error), 2);
    assert_eq!(stats.file_count, 1);
    assert!(stats.total_size_bytes > 0);
    assert_eq!(stats.top_errors[0].value, "sync failed");
    assert_eq!(stats.top_errors[0].count, 2);
}

#[tokio::test]
async fn test_logger_output_is_queryable() {
    let dir = TempDir::new().unwrap();
    let logger = Logger::new(LoggerConfig {
        console: false,
        file_path: Some(dir.path().join("app.log")),
        ..LoggerConfig::default()
    });

    logger.with_correlation_id("req-1").error("upload rejected", None);
    logger.with_correlation_id("req-2").info("upload accepted", None);

    let manager = manager(dir.path(), 10, 1024 * 1024, false);
    let result = manager
        .query(&LogQuery::new().correlation_id("req-1"))
        .await
        .unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.entries[0].message, "upload rejected");
}
