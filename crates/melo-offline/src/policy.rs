//! Which caching strategy applies to which request.
//!
//! A [`CachePolicy`] is an ordered list of rules; the first rule whose
//! matcher accepts a request decides its strategy and bucket.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::request::FetchRequest;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif"];
pub const STATIC_EXTENSIONS: &[&str] = &["js", "mjs", "css", "woff", "woff2", "ttf", "otf"];

/// Named cache partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBucket {
    Static,
    Runtime,
    Images,
    Api,
}

impl CacheBucket {
    pub const ALL: [CacheBucket; 4] = [
        CacheBucket::Static,
        CacheBucket::Runtime,
        CacheBucket::Images,
        CacheBucket::Api,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheBucket::Static => "static",
            CacheBucket::Runtime => "runtime",
            CacheBucket::Images => "images",
            CacheBucket::Api => "api",
        }
    }
}

impl fmt::Display for CacheBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from cache; on miss fetch, store and serve
    CacheFirst,
    /// Fetch and store; on network failure serve from cache
    NetworkFirst,
    /// Serve from cache immediately and refresh it in the background
    StaleWhileRevalidate,
    /// Never touch the cache
    NetworkOnly,
}

/// Request predicate, independent of any URL library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum RequestMatcher {
    Navigation,
    PathPrefix(String),
    Extensions(Vec<String>),
    Any,
}

impl RequestMatcher {
    pub fn extensions(exts: &[&str]) -> Self {
        RequestMatcher::Extensions(exts.iter().map(|e| e.to_string()).collect())
    }

    pub fn matches(&self, request: &FetchRequest) -> bool {
        match self {
            RequestMatcher::Navigation => request.is_navigation(),
            RequestMatcher::PathPrefix(prefix) => request.path().starts_with(prefix.as_str()),
            RequestMatcher::Extensions(exts) => request
                .extension()
                .map_or(false, |ext| exts.iter().any(|e| e.eq_ignore_ascii_case(&ext))),
            RequestMatcher::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRule {
    pub matcher: RequestMatcher,
    pub strategy: Strategy,
    pub bucket: CacheBucket,
}

impl CacheRule {
    pub fn new(matcher: RequestMatcher, strategy: Strategy, bucket: CacheBucket) -> Self {
        Self {
            matcher,
            strategy,
            bucket,
        }
    }
}

/// Ordered rules, evaluated first-match-wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    rules: Vec<CacheRule>,
}

impl CachePolicy {
    pub fn new(rules: Vec<CacheRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CacheRule] {
        &self.rules
    }

    /// Add a rule evaluated before all existing ones
    pub fn prepend(&mut self, rule: CacheRule) {
        self.rules.insert(0, rule);
    }

    pub fn push(&mut self, rule: CacheRule) {
        self.rules.push(rule);
    }

    /// The rule governing `request`; `None` for anything that is not a GET
    pub fn classify(&self, request: &FetchRequest) -> Option<&CacheRule> {
        if !request.is_get() {
            return None;
        }
        self.rules.iter().find(|rule| rule.matcher.matches(request))
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(vec![
            CacheRule::new(RequestMatcher::Navigation, Strategy::NetworkFirst, CacheBucket::Runtime),
            CacheRule::new(
                RequestMatcher::PathPrefix("/api/".to_string()),
                Strategy::NetworkFirst,
                CacheBucket::Api,
            ),
            CacheRule::new(
                RequestMatcher::extensions(IMAGE_EXTENSIONS),
                Strategy::CacheFirst,
                CacheBucket::Images,
            ),
            CacheRule::new(
                RequestMatcher::extensions(STATIC_EXTENSIONS),
                Strategy::StaleWhileRevalidate,
                CacheBucket::Static,
            ),
            CacheRule::new(RequestMatcher::Any, Strategy::NetworkFirst, CacheBucket::Runtime),
        ])
    }
}
