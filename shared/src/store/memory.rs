//! In-memory store implementation.
//!
//! Mimics the subset of store behavior the generator relies on: per-index
//! document lists, index-exists conflicts, `a,b` and `logs-*` targets, and
//! a scriptable cluster health so readiness polling can be exercised.

use super::index::index_for;
use super::{BulkAck, HealthStatus, SearchStore, StoreError};
use crate::models::{LogEvent, LogLevel};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// In-memory search store.
///
/// `None` in the health script means the store is unreachable for that
/// check. Once the script is used up, `steady_health` answers every check.
///
/// **Note:** Data is not persisted across restarts.
///
/// # Example
///
/// ```
/// use shared::store::{InMemorySearchStore, SearchStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemorySearchStore::becoming_ready_after(2);
/// assert!(!store.is_ready().await);
/// assert!(!store.is_ready().await);
/// assert!(store.is_ready().await);
/// # });
/// ```
#[derive(Debug)]
pub struct InMemorySearchStore {
    indices: Arc<RwLock<BTreeMap<String, Vec<LogEvent>>>>,
    health_script: Mutex<VecDeque<Option<HealthStatus>>>,
    steady_health: Option<HealthStatus>,
    health_checks: AtomicU32,
    bulk_requests: AtomicUsize,
}

impl InMemorySearchStore {
    /// Creates an empty, always-green store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_health(Vec::new(), Some(HealthStatus::Green))
    }

    /// Creates a store that is never reachable.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::with_health(Vec::new(), None)
    }

    /// Creates a store that is unreachable for `checks` health checks and
    /// green afterwards.
    #[must_use]
    pub fn becoming_ready_after(checks: usize) -> Self {
        Self::with_health(vec![None; checks], Some(HealthStatus::Green))
    }

    /// Creates a store with an explicit health script.
    #[must_use]
    pub fn with_health(script: Vec<Option<HealthStatus>>, steady: Option<HealthStatus>) -> Self {
        Self {
            indices: Arc::new(RwLock::new(BTreeMap::new())),
            health_script: Mutex::new(script.into()),
            steady_health: steady,
            health_checks: AtomicU32::new(0),
            bulk_requests: AtomicUsize::new(0),
        }
    }

    /// Number of health checks answered so far.
    #[must_use]
    pub fn health_checks(&self) -> u32 {
        self.health_checks.load(Ordering::SeqCst)
    }

    /// Number of bulk requests received so far.
    #[must_use]
    pub fn bulk_requests(&self) -> usize {
        self.bulk_requests.load(Ordering::SeqCst)
    }

    /// Returns the names of all existing indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn index_names(&self) -> Result<Vec<String>, StoreError> {
        let indices = self.indices.read().map_err(|_| StoreError::LockError)?;
        Ok(indices.keys().cloned().collect())
    }

    /// Returns a copy of the documents in one index, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn documents(&self, index: &str) -> Result<Vec<LogEvent>, StoreError> {
        let indices = self.indices.read().map_err(|_| StoreError::LockError)?;
        Ok(indices.get(index).cloned().unwrap_or_default())
    }

    fn matches_target(target: &str, index: &str) -> bool {
        target.split(',').map(str::trim).any(|pattern| {
            pattern
                .strip_suffix('*')
                .map_or(pattern == index, |prefix| index.starts_with(prefix))
        })
    }

    fn matching(&self, target: &str) -> Result<Vec<LogEvent>, StoreError> {
        let indices = self.indices.read().map_err(|_| StoreError::LockError)?;
        Ok(indices
            .iter()
            .filter(|(name, _)| Self::matches_target(target, name))
            .flat_map(|(_, docs)| docs.iter().cloned())
            .collect())
    }
}

impl Default for InMemorySearchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchStore for InMemorySearchStore {
    async fn cluster_health(&self) -> Result<HealthStatus, StoreError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .health_script
            .lock()
            .map_err(|_| StoreError::LockError)?
            .pop_front();
        let answer = match scripted {
            Some(answer) => answer,
            None => self.steady_health,
        };
        answer.ok_or_else(|| StoreError::UnexpectedResponse {
            endpoint: "_cluster/health".to_string(),
            status: 503,
            body: "store not reachable".to_string(),
        })
    }

    async fn create_index(&self, index: &str) -> Result<(), StoreError> {
        let mut indices = self.indices.write().map_err(|_| StoreError::LockError)?;
        if indices.contains_key(index) {
            return Err(StoreError::IndexCreateConflict(index.to_string()));
        }
        indices.insert(index.to_string(), Vec::new());
        Ok(())
    }

    async fn bulk_index(&self, events: &[LogEvent]) -> Result<BulkAck, StoreError> {
        if events.is_empty() {
            return Ok(BulkAck::default());
        }
        self.bulk_requests.fetch_add(1, Ordering::SeqCst);

        let mut indices = self.indices.write().map_err(|_| StoreError::LockError)?;
        for event in events {
            indices
                .entry(index_for(event.timestamp))
                .or_default()
                .push(event.clone());
        }
        Ok(BulkAck {
            indexed: events.len(),
            took_ms: 0,
        })
    }

    async fn count(&self, target: &str, level: Option<LogLevel>) -> Result<u64, StoreError> {
        let count = self
            .matching(target)?
            .iter()
            .filter(|event| level.is_none() || level == Some(event.level))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn search_latest(&self, target: &str, size: usize) -> Result<Vec<LogEvent>, StoreError> {
        let mut events = self.matching(target)?;
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(size);
        Ok(events)
    }
}
