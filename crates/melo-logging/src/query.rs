// File: src/query.rs
// Purpose: In-memory filtering, pagination and aggregation over log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::entry::{LogEntry, LogLevel};

pub const DEFAULT_QUERY_LIMIT: usize = 100;
pub const DEFAULT_TOP_N: usize = 10;

/// Filters applied to every entry of every log file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the message
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Whether a single entry passes every filter set on the query
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }

        if let Some(ref id) = self.correlation_id {
            if entry.correlation_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if let Some(start) = self.start_time {
            if entry.timestamp < start {
                return false;
            }
        }

        if let Some(end) = self.end_time {
            if entry.timestamp > end {
                return false;
            }
        }

        if let Some(ref needle) = self.search {
            if !entry.message.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        if let Some(ref user_id) = self.user_id {
            if entry.effective_user_id() != Some(user_id.as_str()) {
                return false;
            }
        }

        if let Some(ref path) = self.path {
            match entry.request_path() {
                Some(p) if p.contains(path.as_str()) => {}
                _ => return false,
            }
        }

        if let Some(status) = self.status_code {
            if entry.status_code() != Some(status) {
                return false;
            }
        }

        true
    }

    /// Filter, sort newest-first and paginate
    pub fn apply(&self, entries: Vec<LogEntry>) -> QueryResult {
        let mut matched: Vec<LogEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matched.len();
        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

        let entries = matched.into_iter().skip(offset).take(limit).collect();

        QueryResult {
            entries,
            total,
            offset,
            limit,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub entries: Vec<LogEntry>,
    /// Matches before pagination
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl QueryResult {
    pub fn empty(query: &LogQuery) -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            offset: query.offset.unwrap_or(0),
            limit: query.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
        }
    }

    pub fn has_more(&self) -> bool {
        self.offset + self.entries.len() < self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedItem {
    pub value: String,
    pub count: u64,
}

/// Aggregate view over the log directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total_entries: u64,
    pub by_level: BTreeMap<LogLevel, u64>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub top_paths: Vec<CountedItem>,
    pub top_errors: Vec<CountedItem>,
    pub file_count: usize,
    pub total_size_bytes: u64,
}

impl LogStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LogEntry>, top_n: usize) -> Self {
        let mut stats = LogStats::default();
        let mut paths: HashMap<&str, u64> = HashMap::new();
        let mut errors: HashMap<&str, u64> = HashMap::new();

        for entry in entries {
            stats.total_entries += 1;
            *stats.by_level.entry(entry.level).or_insert(0) += 1;

            stats.oldest = Some(stats.oldest.map_or(entry.timestamp, |t| t.min(entry.timestamp)));
            stats.newest = Some(stats.newest.map_or(entry.timestamp, |t| t.max(entry.timestamp)));

            if let Some(path) = entry.request_path() {
                *paths.entry(path).or_insert(0) += 1;
            }

            if entry.level == LogLevel::Error {
                let message = entry
                    .error
                    .as_ref()
                    .map(|e| e.message.as_str())
                    .unwrap_or(entry.message.as_str());
                *errors.entry(message).or_insert(0) += 1;
            }
        }

        stats.top_paths = top_counts(paths, top_n);
        stats.top_errors = top_counts(errors, top_n);
        stats
    }

    pub fn count(&self, level: LogLevel) -> u64 {
        self.by_level.get(&level).copied().unwrap_or(0)
    }
}

fn top_counts(counts: HashMap<&str, u64>, n: usize) -> Vec<CountedItem> {
    let mut items: Vec<CountedItem> = counts
        .into_iter()
        .map(|(value, count)| CountedItem {
            value: value.to_string(),
            count,
        })
        .collect();

    // Highest count first, ties broken alphabetically so output is stable
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    items.truncate(n);
    items
}
