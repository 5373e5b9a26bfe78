//! Bulk submitter.
//!
//! Waits for the store to report ready, optionally creates the daily
//! indices with the event mapping, then writes the whole batch in one bulk
//! request. Only the readiness check is retried.

use crate::models::LogEvent;
use crate::store::{index_for, BulkAck, SearchStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Suspends the caller between readiness checks.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Maximum number of readiness checks.
    pub max_attempts: u32,
    /// Fixed delay between two checks.
    pub delay: Duration,
}

impl ReadinessPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(2))
    }
}

/// Writes event batches to a store.
#[derive(Clone)]
pub struct BulkSubmitter {
    store: Arc<dyn SearchStore>,
    sleeper: Arc<dyn Sleeper>,
    policy: ReadinessPolicy,
    create_indices: bool,
}

impl BulkSubmitter {
    /// Creates a submitter with the default policy and the tokio sleeper.
    #[must_use]
    pub fn new(store: Arc<dyn SearchStore>) -> Self {
        Self {
            store,
            sleeper: Arc::new(TokioSleeper),
            policy: ReadinessPolicy::default(),
            create_indices: false,
        }
    }

    /// Sets the readiness policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the sleeper used between readiness checks.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Creates the target indices with the event mapping before writing.
    #[must_use]
    pub fn with_index_creation(mut self, enabled: bool) -> Self {
        self.create_indices = enabled;
        self
    }

    /// Polls the store until it reports ready.
    ///
    /// Returns the number of checks it took.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] once `max_attempts` checks
    /// have failed.
    pub async fn wait_until_ready(&self) -> Result<u32, StoreError> {
        tracing::info!("Waiting for store to be ready");

        for attempt in 1..=self.policy.max_attempts {
            if self.store.is_ready().await {
                tracing::info!(attempt, "Store is ready");
                return Ok(attempt);
            }

            tracing::info!(
                attempt,
                max_attempts = self.policy.max_attempts,
                "Store not ready yet"
            );
            if attempt < self.policy.max_attempts {
                self.sleeper.sleep(self.policy.delay).await;
            }
        }

        tracing::error!(
            attempts = self.policy.max_attempts,
            "Store not ready after maximum retries"
        );
        Err(StoreError::StoreUnavailable {
            attempts: self.policy.max_attempts,
        })
    }

    /// Creates each index in `indices`.
    ///
    /// An index that already exists is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns any other store error.
    pub async fn ensure_indices(&self, indices: &[String]) -> Result<(), StoreError> {
        for index in indices {
            match self.store.create_index(index).await {
                Ok(()) => tracing::info!(%index, "Created index"),
                Err(StoreError::IndexCreateConflict(index)) => {
                    tracing::warn!(%index, "Index already exists, keeping existing mapping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Waits for readiness, then writes all events in one bulk request.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The store never becomes ready (nothing is written)
    /// - Index creation fails for a reason other than a conflict
    /// - The store rejects documents or the request fails
    pub async fn submit(&self, events: &[LogEvent]) -> Result<BulkAck, StoreError> {
        self.wait_until_ready().await?;

        if self.create_indices {
            let indices: Vec<String> = events
                .iter()
                .map(|event| index_for(event.timestamp))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            self.ensure_indices(&indices).await?;
        }

        let ack = self.store.bulk_index(events).await?;
        tracing::info!(
            indexed = ack.indexed,
            took_ms = ack.took_ms,
            "Bulk write completed"
        );
        Ok(ack)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::generator::generate_at;
    use crate::models::LogLevel;
    use crate::store::InMemorySearchStore;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    /// Records requested sleeps without waiting.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn batch(n: usize) -> Vec<LogEvent> {
        let mut rng = StdRng::seed_from_u64(0);
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|_| generate_at(&mut rng, LogLevel::Error, "web-server", ts))
            .collect()
    }

    #[test]
    fn test_default_policy() {
        let policy = ReadinessPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_never_ready_store_aborts_without_writes() {
        let store = Arc::new(InMemorySearchStore::unavailable());
        let sleeper = Arc::new(RecordingSleeper::default());
        let submitter = BulkSubmitter::new(store.clone()).with_sleeper(sleeper.clone());

        let result = submitter.submit(&batch(6)).await;

        assert!(matches!(
            result,
            Err(StoreError::StoreUnavailable { attempts: 30 })
        ));
        assert_eq!(store.health_checks(), 30);
        assert_eq!(store.bulk_requests(), 0);
        assert_eq!(store.count("logs-*", None).await.unwrap(), 0);

        let slept = sleeper.slept.lock().unwrap();
        assert_eq!(slept.len(), 29);
        assert!(slept.iter().all(|d| *d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_becomes_ready_within_budget() {
        let store = Arc::new(InMemorySearchStore::becoming_ready_after(3));
        let sleeper = Arc::new(RecordingSleeper::default());
        let submitter = BulkSubmitter::new(store.clone())
            .with_sleeper(sleeper.clone())
            .with_policy(ReadinessPolicy::new(5, Duration::from_millis(10)));

        assert_eq!(submitter.wait_until_ready().await.unwrap(), 4);
        assert_eq!(sleeper.slept.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_adds_exactly_n_documents_each_time() {
        let store = Arc::new(InMemorySearchStore::new());
        let submitter =
            BulkSubmitter::new(store.clone()).with_sleeper(Arc::new(RecordingSleeper::default()));
        let events = batch(6);

        let ack = submitter.submit(&events).await.unwrap();
        assert_eq!(ack.indexed, 6);
        assert_eq!(store.count("logs-2024.01.01", None).await.unwrap(), 6);

        submitter.submit(&events).await.unwrap();
        assert_eq!(store.count("logs-2024.01.01", None).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_index_creation_tolerates_existing_index() {
        let store = Arc::new(InMemorySearchStore::new());
        store.create_index("logs-2024.01.01").await.unwrap();
        let submitter = BulkSubmitter::new(store.clone())
            .with_sleeper(Arc::new(RecordingSleeper::default()))
            .with_index_creation(true);

        let ack = submitter.submit(&batch(2)).await.unwrap();

        assert_eq!(ack.indexed, 2);
        assert_eq!(store.index_names().unwrap(), vec!["logs-2024.01.01"]);
    }

    #[tokio::test]
    async fn test_zero_attempt_policy_fails_immediately() {
        let store = Arc::new(InMemorySearchStore::new());
        let submitter = BulkSubmitter::new(store.clone())
            .with_policy(ReadinessPolicy::new(0, Duration::from_secs(1)));

        let result = submitter.wait_until_ready().await;

        assert!(matches!(
            result,
            Err(StoreError::StoreUnavailable { attempts: 0 })
        ));
        assert_eq!(store.health_checks(), 0);
    }
}
