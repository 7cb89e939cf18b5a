// File: src/manager.rs
// Purpose: Rotation, retention and post hoc querying of the log directory

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use walkdir::WalkDir;

use crate::compression::{self, ROTATED_LOG_LEVEL};
use crate::config::RotationConfig;
use crate::entry::LogEntry;
use crate::query::{LogQuery, LogStats, QueryResult, DEFAULT_TOP_N};

/// A `.log` or `.log.gz` file in the managed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileMetadata {
    pub path: PathBuf,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
    pub compressed: bool,
}

impl LogFileMetadata {
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }

    /// Active files keep the plain `name.log` form; rotated ones carry a date suffix
    pub fn is_rotated(&self) -> bool {
        self.compressed || rotated_stem(self.file_name()).is_some()
    }
}

/// Manages the files of one log directory
#[derive(Debug, Clone)]
pub struct LogFileManager {
    config: RotationConfig,
}

impl LogFileManager {
    pub fn new(config: RotationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// All log files in the directory, oldest modification first
    pub async fn list_files(&self) -> Result<Vec<LogFileMetadata>> {
        let dir = self.config.directory.clone();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(e)
                        .with_context(|| format!("Failed to read log directory {}", dir.display()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            if entry.depth() == 0 {
                if !entry.file_type().is_dir() {
                    anyhow::bail!("Log directory {} is not a directory", dir.display());
                }
                continue;
            }

            if !entry.file_type().is_file() || !is_log_file(entry.path()) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = ?entry.path(), error = %e, "skipping unreadable log file");
                    continue;
                }
            };

            files.push(LogFileMetadata {
                path: entry.path().to_path_buf(),
                size: metadata.len(),
                created: metadata.created().ok().map(DateTime::<Utc>::from),
                modified: DateTime::<Utc>::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
                compressed: compression::is_gzip(entry.path()),
            });
        }

        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
        Ok(files)
    }

    /// Rotate every active file at or over the size limit, then apply retention.
    ///
    /// Returns the paths the rotated files now live at.
    pub async fn rotate(&self) -> Result<Vec<PathBuf>> {
        let mut rotated = Vec::new();

        for file in self.list_files().await? {
            if file.is_rotated() || file.size < self.config.max_size {
                continue;
            }

            match self.rotate_file(&file.path).await {
                Ok(path) => {
                    tracing::info!(
                        from = ?file.path,
                        to = ?path,
                        size = file.size,
                        "rotated log file"
                    );
                    rotated.push(path);
                }
                Err(e) => tracing::error!(path = ?file.path, error = %e, "failed to rotate log file"),
            }
        }

        self.cleanup().await?;
        Ok(rotated)
    }

    async fn rotate_file(&self, path: &Path) -> Result<PathBuf> {
        let target = rotated_path(path, Utc::now());

        fs::rename(path, &target)
            .await
            .with_context(|| format!("Failed to rename {:?} to {:?}", path, target))?;

        if !self.config.compress {
            return Ok(target);
        }

        let gz_path = append_extension(&target, "gz");
        let (source, dest) = (target.clone(), gz_path.clone());
        tokio::task::spawn_blocking(move || compression::gzip_file(&source, &dest, ROTATED_LOG_LEVEL))
            .await
            .context("Compression task panicked")?
            .with_context(|| format!("Failed to gzip {:?}", target))?;

        fs::remove_file(&target)
            .await
            .with_context(|| format!("Failed to remove uncompressed {:?}", target))?;

        Ok(gz_path)
    }

    /// Delete the oldest files until at most `max_files` remain.
    ///
    /// Returns the removed paths.
    pub async fn cleanup(&self) -> Result<Vec<PathBuf>> {
        let files = self.list_files().await?;
        if files.len() <= self.config.max_files {
            return Ok(Vec::new());
        }

        let excess = files.len() - self.config.max_files;
        let mut removed = Vec::with_capacity(excess);

        for file in files.into_iter().take(excess) {
            match fs::remove_file(&file.path).await {
                Ok(()) => {
                    tracing::info!(path = ?file.path, "removed old log file");
                    removed.push(file.path);
                }
                Err(e) => tracing::error!(path = ?file.path, error = %e, "failed to remove old log file"),
            }
        }

        Ok(removed)
    }

    /// Every parseable entry in every file. Unreadable files and malformed lines are skipped.
    pub async fn read_entries(&self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();

        for file in self.list_files().await? {
            match read_file_entries(&file).await {
                Ok(mut file_entries) => entries.append(&mut file_entries),
                Err(e) => tracing::warn!(path = ?file.path, error = %e, "skipping unreadable log file"),
            }
        }

        Ok(entries)
    }

    /// Filter, sort newest-first and paginate across all files
    pub async fn query(&self, query: &LogQuery) -> Result<QueryResult> {
        let entries = self.read_entries().await?;
        Ok(query.apply(entries))
    }

    pub async fn stats(&self) -> Result<LogStats> {
        let files = self.list_files().await?;
        let entries = self.read_entries().await?;

        let mut stats = LogStats::from_entries(&entries, DEFAULT_TOP_N);
        stats.file_count = files.len();
        stats.total_size_bytes = files.iter().map(|f| f.size).sum();
        Ok(stats)
    }
}

async fn read_file_entries(file: &LogFileMetadata) -> Result<Vec<LogEntry>> {
    let path = file.path.clone();
    let bytes = tokio::task::spawn_blocking(move || compression::read_log_file(&path))
        .await
        .context("Read task panicked")?
        .with_context(|| format!("Failed to read {:?}", file.path))?;

    let text = String::from_utf8_lossy(&bytes);
    let mut malformed = 0usize;
    let entries: Vec<LogEntry> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(_) => {
                malformed += 1;
                None
            }
        })
        .collect();

    if malformed > 0 {
        tracing::debug!(path = ?file.path, malformed, "ignored malformed log lines");
    }

    Ok(entries)
}

fn is_log_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.ends_with(".log") || name.ends_with(".log.gz")
}

/// `app.20261016-120000.log` -> `Some("app")`
fn rotated_stem(file_name: &str) -> Option<&str> {
    let without_ext = file_name.strip_suffix(".log")?;
    let (stem, suffix) = without_ext.rsplit_once('.')?;
    let looks_like_date = suffix.len() >= 15
        && suffix.chars().all(|c| c.is_ascii_digit() || c == '-');
    looks_like_date.then_some(stem)
}

fn rotated_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    let stamp = now.format("%Y%m%d-%H%M%S");
    let mut candidate = path.with_file_name(format!("{}.{}.log", stem, stamp));

    // Two rotations within the same second get a counter
    let mut counter = 1;
    while candidate.exists() || append_extension(&candidate, "gz").exists() {
        candidate = path.with_file_name(format!("{}.{}-{}.log", stem, stamp, counter));
        counter += 1;
    }

    candidate
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}
