//! Verification probe.
//!
//! Re-reads the store after a submission and reports what landed. A count
//! below expectation is reported, never raised.

use crate::models::{LogEvent, LogLevel};
use crate::store::{SearchStore, StoreError};
use std::sync::Arc;

/// Default number of sampled documents.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// Documents counted in the target.
    pub actual_count: u64,
    /// Minimum the caller expected.
    pub expected_minimum: u64,
    /// Whether `actual_count >= expected_minimum`.
    pub matched: bool,
    /// Newest documents in the target.
    pub sample: Vec<LogEvent>,
}

/// Counts and samples documents in the store.
#[derive(Clone)]
pub struct VerificationProbe {
    store: Arc<dyn SearchStore>,
    sample_size: usize,
    level: Option<LogLevel>,
}

impl VerificationProbe {
    /// Creates a probe counting all levels.
    #[must_use]
    pub fn new(store: Arc<dyn SearchStore>) -> Self {
        Self {
            store,
            sample_size: DEFAULT_SAMPLE_SIZE,
            level: None,
        }
    }

    /// Sets how many documents to sample.
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Restricts the count to one level.
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    /// Counts documents in `target` and samples the newest ones.
    ///
    /// A failed sample query is logged and leaves the sample empty.
    ///
    /// # Errors
    ///
    /// Returns an error only if the count query fails.
    pub async fn verify(
        &self,
        target: &str,
        expected_minimum: u64,
    ) -> Result<Verification, StoreError> {
        let actual_count = self.store.count(target, self.level).await?;
        let sample = if self.sample_size == 0 {
            Vec::new()
        } else {
            match self.store.search_latest(target, self.sample_size).await {
                Ok(sample) => sample,
                Err(e) => {
                    tracing::warn!(index_target = target, error = %e, "Sampling failed");
                    Vec::new()
                }
            }
        };
        let matched = actual_count >= expected_minimum;

        tracing::info!(
            index_target = target,
            level = ?self.level,
            actual_count,
            expected_minimum,
            matched,
            "Verification complete"
        );
        for event in &sample {
            tracing::info!(
                timestamp = %event.timestamp,
                level = %event.level,
                message = %event.message,
                "Sample document"
            );
        }
        if !matched {
            tracing::warn!(
                actual_count,
                expected_minimum,
                "Fewer documents than expected"
            );
        }

        Ok(Verification {
            actual_count,
            expected_minimum,
            matched,
            sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_at;
    use crate::store::{ElasticsearchStore, InMemorySearchStore};
    use chrono::{Duration, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn seeded_store(errors: i64, infos: i64) -> Arc<InMemorySearchStore> {
        let store = Arc::new(InMemorySearchStore::new());
        let mut rng = StdRng::seed_from_u64(0);
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut events = Vec::new();
        for i in 0..errors {
            events.push(generate_at(&mut rng, LogLevel::Error, "svc", t0 + Duration::seconds(i)));
        }
        for i in 0..infos {
            events.push(generate_at(&mut rng, LogLevel::Info, "svc", t0 + Duration::seconds(100 + i)));
        }
        store.bulk_index(&events).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_verify_matched() {
        let store = seeded_store(6, 0).await;
        let probe = VerificationProbe::new(store);

        let result = probe.verify("logs-2024.01.01", 6).await.unwrap();

        assert_eq!(result.actual_count, 6);
        assert!(result.matched);
        assert_eq!(result.sample.len(), 5);
        assert!(result.sample[0].timestamp >= result.sample[1].timestamp);
    }

    #[tokio::test]
    async fn test_verify_reports_shortfall_without_error() {
        let store = seeded_store(3, 0).await;
        let probe = VerificationProbe::new(store);

        let result = probe.verify("logs-2024.01.01", 5).await.unwrap();

        assert_eq!(result.actual_count, 3);
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_verify_level_filter() {
        let store = seeded_store(4, 10).await;
        let probe = VerificationProbe::new(store).with_level(Some(LogLevel::Error));

        let result = probe.verify("logs-*", 5).await.unwrap();

        assert_eq!(result.actual_count, 4);
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_verify_keeps_count_when_sampling_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs-2024.01.01/_count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 21})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/logs-2024.01.01/_search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("shard failure"))
            .mount(&server)
            .await;

        let store = Arc::new(ElasticsearchStore::new(server.uri()).unwrap());
        let probe = VerificationProbe::new(store);

        let result = probe.verify("logs-2024.01.01", 15).await.unwrap();

        assert_eq!(result.actual_count, 21);
        assert!(result.matched);
        assert!(result.sample.is_empty());
    }

    #[tokio::test]
    async fn test_verify_tolerates_naive_timestamps_in_shared_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs-2024.01.01/_count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 21})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/logs-2024.01.01/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{"_source": {
                    "@timestamp": "2024-01-01T12:00:00.123456",
                    "level": "error",
                    "message": "Database connection failed",
                    "service": "web-server"
                }}]}
            })))
            .mount(&server)
            .await;

        let store = Arc::new(ElasticsearchStore::new(server.uri()).unwrap());
        let probe = VerificationProbe::new(store);

        let result = probe.verify("logs-2024.01.01", 15).await.unwrap();

        assert_eq!(result.actual_count, 21);
        assert!(result.matched);
        assert!(result.sample.is_empty());
    }

    #[tokio::test]
    async fn test_verify_missing_index_counts_zero() {
        let store = Arc::new(InMemorySearchStore::new());
        let probe = VerificationProbe::new(store).with_sample_size(0);

        let result = probe.verify("logs-2030.01.01", 1).await.unwrap();

        assert_eq!(result.actual_count, 0);
        assert!(result.sample.is_empty());
    }
}
