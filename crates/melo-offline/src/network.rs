//! Network access for the fetch interceptor

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::request::{is_absolute_url, FetchRequest, FetchResponse};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Something that can perform a fetch over the network
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError>;
}

/// [`Network`] backed by an HTTP client; relative URLs resolve against `base_url`
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNetwork {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, url: &str) -> String {
        if is_absolute_url(url) {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        let url = self.resolve(&request.url);
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| NetworkError::InvalidRequest(format!("method '{}'", request.method)))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout(url.clone())
            } else if e.is_builder() {
                NetworkError::InvalidRequest(e.to_string())
            } else {
                NetworkError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        Ok(FetchResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_urls() {
        let network = HttpNetwork::new("https://chat.example.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(network.resolve("/api/rooms"), "https://chat.example.org/api/rooms");
        assert_eq!(network.resolve("manifest.json"), "https://chat.example.org/manifest.json");
        assert_eq!(network.resolve("https://cdn.example.org/x.js"), "https://cdn.example.org/x.js");
        assert_eq!(
            network.resolve("/api/proxy?u=http://a.b/c"),
            "https://chat.example.org/api/proxy?u=http://a.b/c"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_maps_to_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let network = HttpNetwork::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = network.fetch(&FetchRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, NetworkError::Unreachable(_) | NetworkError::Timeout(_)));
    }
}
