//! Search store access.
//!
//! The `SearchStore` trait abstracts the handful of store operations the
//! generator needs, so the submitter and probe can run against Elasticsearch
//! or against an in-memory stand-in in tests.

pub mod bulk;
pub mod elasticsearch;
pub mod index;
pub mod memory;

pub use bulk::bulk_body;
pub use elasticsearch::ElasticsearchStore;
pub use index::{index_for, index_mapping, indices_for_window, target_for};
pub use memory::InMemorySearchStore;

use crate::models::{LogEvent, LogLevel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Readiness was never reached within the retry budget.
    #[error("Store unavailable after {attempts} readiness checks")]
    StoreUnavailable {
        /// Number of readiness checks performed.
        attempts: u32,
    },

    /// The store rejected some or all documents of a bulk request.
    #[error("Bulk write rejected {failed} of {total} documents: {}", .errors.join("; "))]
    BulkWrite {
        /// Number of rejected documents.
        failed: usize,
        /// Number of documents in the request.
        total: usize,
        /// Per-document errors as reported by the store.
        errors: Vec<String>,
    },

    /// The index already exists.
    #[error("Index {0} already exists")]
    IndexCreateConflict(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an unexpected status.
    #[error("Unexpected response from {endpoint} ({status}): {body}")]
    UnexpectedResponse {
        /// Endpoint path that was called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// A request or response body could not be (de)serialized.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to acquire lock on the in-memory store.
    #[error("Failed to acquire lock on in-memory store")]
    LockError,
}

/// Cluster health as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All shards allocated.
    Green,
    /// Primaries allocated, some replicas missing.
    Yellow,
    /// Some primaries unallocated.
    Red,
}

impl HealthStatus {
    /// Returns true for `green` and `yellow`.
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Green | Self::Yellow)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

/// Acknowledgement of a successful bulk write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkAck {
    /// Number of documents indexed.
    pub indexed: usize,
    /// Server-side processing time in milliseconds.
    pub took_ms: u64,
}

/// Trait for search store implementations.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Returns the cluster health status.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or answers
    /// unexpectedly.
    async fn cluster_health(&self) -> Result<HealthStatus, StoreError>;

    /// Returns true if the store accepts writes.
    ///
    /// Any failure to obtain the health status counts as not ready.
    async fn is_ready(&self) -> bool {
        match self.cluster_health().await {
            Ok(status) => status.is_ready(),
            Err(e) => {
                tracing::debug!(error = %e, "Readiness check failed");
                false
            }
        }
    }

    /// Creates an index with the event mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexCreateConflict`] if the index exists, or
    /// another error if the request fails.
    async fn create_index(&self, index: &str) -> Result<(), StoreError>;

    /// Writes all events in one bulk request, each into the daily index of
    /// its own timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BulkWrite`] if the store rejects any document,
    /// or another error if the request fails.
    async fn bulk_index(&self, events: &[LogEvent]) -> Result<BulkAck, StoreError>;

    /// Counts documents in `target`, optionally restricted to one level.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn count(&self, target: &str, level: Option<LogLevel>) -> Result<u64, StoreError>;

    /// Returns up to `size` documents from `target`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn search_latest(&self, target: &str, size: usize) -> Result<Vec<LogEvent>, StoreError>;
}
