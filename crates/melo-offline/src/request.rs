//! Requests and responses as seen by the fetch interceptor.
//!
//! These are deliberately plain data: policy decisions work on the URL
//! string and request mode, not on any particular HTTP or URL library.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the browser issued the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Top-level page navigation
    Navigate,
    /// Any subresource or script-initiated fetch
    #[default]
    Other,
}

/// An intercepted fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            mode: RequestMode::Other,
            headers: BTreeMap::new(),
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// `scheme://host[:port]`, or `None` for relative URLs
    pub fn origin(&self) -> Option<&str> {
        origin_end(&self.url).map(|end| &self.url[..end])
    }

    /// Path component without query or fragment; always starts with `/`
    pub fn path(&self) -> &str {
        let after_origin = match self.origin() {
            Some(origin) => &self.url[origin.len()..],
            None => self.url.as_str(),
        };
        let end = after_origin.find(['?', '#']).unwrap_or(after_origin.len());
        let path = &after_origin[..end];
        if path.is_empty() {
            "/"
        } else {
            path
        }
    }

    /// Lowercased extension of the last path segment, if any
    pub fn extension(&self) -> Option<String> {
        let segment = self.path().rsplit('/').next()?;
        let (stem, ext) = segment.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Cache key: the URL without its fragment
    pub fn cache_key(&self) -> &str {
        self.url.split('#').next().unwrap_or(&self.url)
    }
}

/// Byte offset where the `scheme://authority` prefix of an absolute URL ends.
///
/// The scheme must start with a letter and hold only letters, digits, `+`,
/// `-` or `.`, so a `://` inside a path or query string never counts.
fn origin_end(url: &str) -> Option<usize> {
    let scheme_end = url.find("://")?;
    let mut scheme = url[..scheme_end].chars();
    let valid = scheme.next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return None;
    }

    let rest = &url[scheme_end + 3..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(scheme_end + 3 + host_end)
}

/// Whether `url` carries its own scheme and host
pub fn is_absolute_url(url: &str) -> bool {
    origin_end(url).is_some()
}

/// A response from the network or the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn html(status: u16, html: &str) -> Self {
        Self::new(status, html.as_bytes().to_vec()).with_header("content-type", "text/html; charset=utf-8")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// 2xx, the only responses worth caching
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_origin() {
        let req = FetchRequest::get("https://chat.example.org/api/rooms?limit=10#top");
        assert_eq!(req.origin(), Some("https://chat.example.org"));
        assert_eq!(req.path(), "/api/rooms");
        assert_eq!(req.cache_key(), "https://chat.example.org/api/rooms?limit=10");

        let bare = FetchRequest::get("https://chat.example.org");
        assert_eq!(bare.path(), "/");

        let relative = FetchRequest::get("/static/app.js?v=3");
        assert_eq!(relative.origin(), None);
        assert_eq!(relative.path(), "/static/app.js");
    }

    #[test]
    fn test_embedded_url_stays_relative() {
        let req = FetchRequest::get("/api/proxy?u=http://a.b/c");
        assert_eq!(req.origin(), None);
        assert_eq!(req.path(), "/api/proxy");

        let req = FetchRequest::get("/img/a.png?src=https://cdn.x");
        assert_eq!(req.path(), "/img/a.png");
        assert_eq!(req.extension().as_deref(), Some("png"));

        assert!(is_absolute_url("wss+json://chat.example.org/sync"));
        assert!(!is_absolute_url("rooms/a?next=https://x.y"));
        assert!(!is_absolute_url("://missing-scheme"));
        assert!(!is_absolute_url("9p://host"));
    }

    #[test]
    fn test_extension() {
        assert_eq!(FetchRequest::get("/icons/Logo.PNG").extension().as_deref(), Some("png"));
        assert_eq!(FetchRequest::get("/rooms/abc").extension(), None);
        assert_eq!(FetchRequest::get("/.well-known").extension(), None);
        assert_eq!(
            FetchRequest::get("https://cdn.example.org/a/b.min.css").extension().as_deref(),
            Some("css")
        );
    }

    #[test]
    fn test_response_ok_range() {
        assert!(FetchResponse::new(204, Vec::new()).is_ok());
        assert!(!FetchResponse::new(304, Vec::new()).is_ok());
        assert!(!FetchResponse::new(500, Vec::new()).is_ok());
    }
}
