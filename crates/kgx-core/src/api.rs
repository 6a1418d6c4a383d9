//! Client for the backend's auxiliary endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::USER_AGENT;
use crate::stream::{IngestError, StreamClient};

const HEALTH_PATH: &str = "/health";
const SYSTEM_INFO_PATH: &str = "/api/v1/system-info";
const SAMPLE_QUERIES_PATH: &str = "/api/v1/sample-queries";
const SEARCH_STREAM_PATH: &str = "/api/v1/search/stream";

/// Backend statuses that count as alive.
const LIVE_STATUSES: [&str; 2] = ["healthy", "degraded"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleQuery {
    pub title: String,
    pub query: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleQueries {
    pub queries: Vec<SampleQuery>,
    pub categories: Vec<String>,
}

/// HTTP client bound to one backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    connect_timeout: Option<Duration>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, connect_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn stream_url(&self) -> String {
        self.url(SEARCH_STREAM_PATH)
    }

    /// Stream client for `POST /api/v1/search/stream`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn stream_client(&self) -> Result<StreamClient> {
        StreamClient::new(self.stream_url(), self.connect_timeout)
    }

    /// Liveness probe. Any transport or decode failure counts as down.
    pub async fn health(&self) -> bool {
        match self.get_json(HEALTH_PATH).await {
            Ok(body) => {
                let status = body.get("status").and_then(Value::as_str).unwrap_or("");
                debug!(status, "Health probe");
                LIVE_STATUSES.contains(&status)
            }
            Err(err) => {
                debug!(error = %format!("{err:#}"), "Health probe failed");
                false
            }
        }
    }

    /// # Errors
    /// Returns an error on transport failure, non-2xx status, or bad JSON.
    pub async fn system_info(&self) -> Result<Value> {
        self.get_json(SYSTEM_INFO_PATH).await
    }

    /// # Errors
    /// Returns an error on transport failure, non-2xx status, or bad JSON.
    pub async fn sample_queries(&self) -> Result<SampleQueries> {
        let body = self.get_json(SAMPLE_QUERIES_PATH).await?;
        serde_json::from_value(body).context("Unexpected sample queries payload")
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| IngestError::from_reqwest(&e))
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::http_status(status.as_u16(), &body))
                .with_context(|| format!("GET {url}"));
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {url}"))
    }
}
