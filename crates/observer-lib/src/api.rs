//! HTTP client for the observatory backend snapshot endpoints

use crate::engine::{Snapshot, SnapshotSource};
use crate::models::{Node, Pod};
use crate::observability::ObserverMetrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use url::Url;

/// Errors from a snapshot request
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request path {path}: {source}")]
    Path {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Backend health endpoint payload
#[derive(Debug, Clone, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    pub service: String,
}

/// API client for the observatory backend
pub struct ApiClient {
    client: Client,
    base_url: Url,
    metrics: ObserverMetrics,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid backend URL")?;

        Ok(Self {
            client,
            base_url,
            metrics: ObserverMetrics::new(),
        })
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.base_url.join(path).map_err(|source| ApiError::Path {
            path: path.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch the full current node list
    pub async fn fetch_nodes(&self) -> Result<Vec<Node>, ApiError> {
        self.get("/api/nodes").await
    }

    /// Fetch the full current pod list
    pub async fn fetch_pods(&self) -> Result<Vec<Pod>, ApiError> {
        self.get("/api/pods").await
    }

    /// Check the backend's own health endpoint
    pub async fn health(&self) -> Result<BackendHealth, ApiError> {
        self.get("/api/health").await
    }

    /// Fetch both resource lists as one point-in-time snapshot
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, ApiError> {
        let started = Instant::now();
        let (nodes, pods) = tokio::try_join!(self.fetch_nodes(), self.fetch_pods())?;
        self.metrics
            .observe_snapshot_latency(started.elapsed().as_secs_f64());

        Ok(Snapshot { nodes, pods })
    }
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn fetch(&self) -> Result<Snapshot> {
        self.fetch_snapshot().await.map_err(anyhow::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_client_accepts_base_url() {
        let client = ApiClient::new("http://localhost:8000").unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8000/");
    }
}
