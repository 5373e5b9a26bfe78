//! Elasticsearch-backed store.
//!
//! Talks to the store's REST API with `reqwest`: cluster health, index
//! creation, `_bulk`, `_count` and `_search`.

use super::bulk::bulk_body;
use super::index::index_mapping;
use super::{BulkAck, HealthStatus, SearchStore, StoreError};
use crate::models::{LogEvent, LogLevel};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Default store URL.
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read queries tolerate indices that do not exist yet.
const LENIENT_INDICES: [(&str, &str); 2] =
    [("ignore_unavailable", "true"), ("allow_no_indices", "true")];

#[derive(Debug, Deserialize)]
struct ClusterHealthResponse {
    status: HealthStatus,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    took: u64,
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Elasticsearch store client.
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: String,
}

impl ElasticsearchStore {
    /// Creates a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a store around an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn ensure_success(endpoint: &str, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::UnexpectedResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchStore for ElasticsearchStore {
    async fn cluster_health(&self) -> Result<HealthStatus, StoreError> {
        let endpoint = "_cluster/health";
        let response = self.client.get(self.url(endpoint)).send().await?;
        let response = Self::ensure_success(endpoint, response).await?;
        let health: ClusterHealthResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(health.status)
    }

    async fn create_index(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url(index))
            .json(&index_mapping())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(index, "Created index");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error_type = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["type"].as_str().map(str::to_string));
        if error_type.as_deref() == Some("resource_already_exists_exception") {
            return Err(StoreError::IndexCreateConflict(index.to_string()));
        }

        Err(StoreError::UnexpectedResponse {
            endpoint: index.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn bulk_index(&self, events: &[LogEvent]) -> Result<BulkAck, StoreError> {
        if events.is_empty() {
            return Ok(BulkAck::default());
        }

        let endpoint = "_bulk";
        let response = self
            .client
            .post(self.url(endpoint))
            .header(header::CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(events)?)
            .send()
            .await?;
        let response = Self::ensure_success(endpoint, response).await?;
        let bulk: BulkResponse = serde_json::from_slice(&response.bytes().await?)?;

        if bulk.errors {
            let errors: Vec<String> = bulk
                .items
                .iter()
                .flat_map(HashMap::values)
                .filter_map(|item| item.error.as_ref().map(Value::to_string))
                .collect();
            return Err(StoreError::BulkWrite {
                failed: errors.len(),
                total: events.len(),
                errors,
            });
        }

        Ok(BulkAck {
            indexed: events.len(),
            took_ms: bulk.took,
        })
    }

    async fn count(&self, target: &str, level: Option<LogLevel>) -> Result<u64, StoreError> {
        let endpoint = format!("{target}/_count");
        let query = match level {
            Some(level) => json!({"query": {"term": {"level": level.to_string()}}}),
            None => json!({"query": {"match_all": {}}}),
        };

        let response = self
            .client
            .post(self.url(&endpoint))
            .query(&LENIENT_INDICES)
            .json(&query)
            .send()
            .await?;
        let response = Self::ensure_success(&endpoint, response).await?;
        let count: CountResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(count.count)
    }

    async fn search_latest(&self, target: &str, size: usize) -> Result<Vec<LogEvent>, StoreError> {
        let endpoint = format!("{target}/_search");
        let query = json!({
            "query": {"match_all": {}},
            "size": size,
            "sort": [{"@timestamp": {"order": "desc"}}]
        });

        let response = self
            .client
            .post(self.url(&endpoint))
            .query(&LENIENT_INDICES)
            .json(&query)
            .send()
            .await?;
        let response = Self::ensure_success(&endpoint, response).await?;
        let search: SearchResponse = serde_json::from_slice(&response.bytes().await?)?;

        // Daily indices are shared with other writers; foreign documents are skipped.
        let events = search
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| match serde_json::from_value::<LogEvent>(hit.source) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(
                        id = hit.id.as_deref().unwrap_or("-"),
                        error = %e,
                        "Skipping document that is not a log event"
                    );
                    None
                }
            })
            .collect();
        Ok(events)
    }
}
