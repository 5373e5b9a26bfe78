//! Burst runs.
//!
//! A run schedules a burst, submits it, optionally waits for the alerting
//! rule to evaluate, and finishes with a verification probe. The two
//! preset plans correspond to the two trigger scenarios: a deterministic
//! back-fill of the last minute and a noisy burst starting now.

use crate::generator::schedule;
use crate::models::{BurstSpec, BurstSpecError, Distribution, LevelMix, LogEvent, LogLevel};
use crate::probe::{Verification, VerificationProbe, DEFAULT_SAMPLE_SIZE};
use crate::store::{indices_for_window, target_for, BulkAck, SearchStore, StoreError};
use crate::submitter::{BulkSubmitter, ReadinessPolicy, Sleeper};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;

/// Error-count threshold the frequency rule is configured with.
pub const DEFAULT_ALERT_THRESHOLD: u64 = 5;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The burst specification is invalid.
    #[error("Invalid burst: {0}")]
    Spec(#[from] BurstSpecError),

    /// The store could not be written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What to generate and how to check it.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstPlan {
    /// The burst to generate.
    pub spec: BurstSpec,
    /// Create the daily indices with the event mapping first.
    pub create_indices: bool,
    /// Wait between submission and verification.
    pub settle: std::time::Duration,
    /// Count only this level when verifying.
    pub verify_level: Option<LogLevel>,
    /// Minimum expected count; `None` means the burst size.
    pub expected_minimum: Option<u64>,
    /// Number of newest documents to sample.
    pub sample_size: usize,
}

impl BurstPlan {
    /// Six error events evenly spread over the minute before `now`.
    ///
    /// Creates the index mapping and verifies immediately.
    #[must_use]
    pub fn populate(now: DateTime<Utc>) -> Self {
        Self {
            spec: BurstSpec::ending_at(6, now, Duration::seconds(60))
                .with_distribution(Distribution::Uniform)
                .with_level(LevelMix::Fixed(LogLevel::Error)),
            create_indices: true,
            settle: std::time::Duration::ZERO,
            verify_level: None,
            expected_minimum: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Fifteen error events at random offsets in the two minutes after
    /// `now`.
    ///
    /// Waits 30 seconds, then checks the error count against the rule
    /// threshold.
    #[must_use]
    pub fn burst(now: DateTime<Utc>) -> Self {
        Self {
            spec: BurstSpec::starting_at(15, now, Duration::seconds(120))
                .with_distribution(Distribution::Random)
                .with_level(LevelMix::Fixed(LogLevel::Error)),
            create_indices: false,
            settle: std::time::Duration::from_secs(30),
            verify_level: Some(LogLevel::Error),
            expected_minimum: Some(DEFAULT_ALERT_THRESHOLD),
            sample_size: 0,
        }
    }

    /// Replaces the burst spec.
    #[must_use]
    pub fn with_spec(mut self, spec: BurstSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Sets the settle wait.
    #[must_use]
    pub fn with_settle(mut self, settle: std::time::Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Sets the expected minimum count.
    #[must_use]
    pub fn with_expected_minimum(mut self, expected_minimum: Option<u64>) -> Self {
        self.expected_minimum = expected_minimum;
        self
    }

    /// Returns the minimum count verification expects.
    #[must_use]
    pub fn expected_minimum(&self) -> u64 {
        self.expected_minimum
            .unwrap_or_else(|| u64::try_from(self.spec.count).unwrap_or(u64::MAX))
    }

    /// Returns the multi-index target covering the burst window.
    #[must_use]
    pub fn target(&self) -> String {
        target_for(&indices_for_window(
            self.spec.window_start,
            self.spec.window_end,
        ))
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The events that were written.
    pub events: Vec<LogEvent>,
    /// Store acknowledgement.
    pub ack: BulkAck,
    /// Index target used for verification.
    pub target: String,
    /// Verification outcome; `None` if the probe queries failed.
    pub verification: Option<Verification>,
}

/// Drives runs against one store.
#[derive(Clone)]
pub struct BurstRunner {
    store: Arc<dyn SearchStore>,
    sleeper: Arc<dyn Sleeper>,
    policy: ReadinessPolicy,
}

impl BurstRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        store: Arc<dyn SearchStore>,
        sleeper: Arc<dyn Sleeper>,
        policy: ReadinessPolicy,
    ) -> Self {
        Self {
            store,
            sleeper,
            policy,
        }
    }

    /// Executes a plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid, the store never becomes
    /// ready, or the bulk write fails. Verification failures are logged
    /// and reported as a missing verification instead.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        plan: &BurstPlan,
        rng: &mut R,
    ) -> Result<RunReport, RunError> {
        let events = schedule(&plan.spec, rng)?;
        tracing::info!(
            count = events.len(),
            window_start = %plan.spec.window_start,
            window_end = %plan.spec.window_end,
            distribution = %plan.spec.distribution,
            "Scheduled burst"
        );

        let submitter = BulkSubmitter::new(Arc::clone(&self.store))
            .with_sleeper(Arc::clone(&self.sleeper))
            .with_policy(self.policy)
            .with_index_creation(plan.create_indices);
        let ack = submitter.submit(&events).await?;

        if !plan.settle.is_zero() {
            tracing::info!(
                settle_secs = plan.settle.as_secs(),
                "Waiting before verification"
            );
            self.sleeper.sleep(plan.settle).await;
        }

        let target = plan.target();
        let probe = VerificationProbe::new(Arc::clone(&self.store))
            .with_sample_size(plan.sample_size)
            .with_level(plan.verify_level);
        let verification = match probe.verify(&target, plan.expected_minimum()).await {
            Ok(verification) => Some(verification),
            Err(e) => {
                tracing::warn!(error = %e, "Verification failed");
                None
            }
        };

        Ok(RunReport {
            events,
            ack,
            target,
            verification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySearchStore;
    use crate::submitter::tests::RecordingSleeper;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn runner(store: Arc<InMemorySearchStore>, sleeper: Arc<RecordingSleeper>) -> BurstRunner {
        BurstRunner::new(store, sleeper, ReadinessPolicy::default())
    }

    #[tokio::test]
    async fn test_end_to_end_six_uniform_errors() {
        let store = Arc::new(InMemorySearchStore::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let plan = BurstPlan::populate(t())
            .with_spec(BurstSpec::starting_at(6, t(), Duration::seconds(60)));

        let report = runner(store.clone(), sleeper)
            .run(&plan, &mut StdRng::seed_from_u64(42))
            .await
            .unwrap();

        let offsets: Vec<i64> = report
            .events
            .iter()
            .map(|e| (e.timestamp - t()).num_seconds())
            .collect();
        assert_eq!(offsets, vec![0, 10, 20, 30, 40, 50]);
        assert!(report.events.iter().all(|e| e.level == LogLevel::Error));
        assert!(report
            .events
            .iter()
            .all(|e| [500, 502, 503, 504].contains(&e.status_code)));

        assert_eq!(report.target, "logs-2024.01.01");
        let verification = report.verification.unwrap();
        assert!(verification.actual_count >= 6);
        assert!(verification.matched);
        assert_eq!(verification.sample.len(), 5);
        assert_eq!(store.index_names().unwrap(), vec!["logs-2024.01.01"]);
    }

    #[tokio::test]
    async fn test_burst_plan_waits_and_counts_errors() {
        let store = Arc::new(InMemorySearchStore::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let plan = BurstPlan::burst(t());

        let report = runner(store.clone(), sleeper.clone())
            .run(&plan, &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();

        assert_eq!(report.events.len(), 15);
        assert!(report.events.iter().all(|e| plan.spec.contains(e.timestamp)));
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![std::time::Duration::from_secs(30)]
        );

        let verification = report.verification.unwrap();
        assert_eq!(verification.actual_count, 15);
        assert_eq!(verification.expected_minimum, DEFAULT_ALERT_THRESHOLD);
        assert!(verification.matched);
        assert!(verification.sample.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_aborts_run() {
        let store = Arc::new(InMemorySearchStore::unavailable());
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = runner(store.clone(), sleeper)
            .run(&BurstPlan::populate(t()), &mut StdRng::seed_from_u64(0))
            .await;

        assert!(matches!(
            result,
            Err(RunError::Store(StoreError::StoreUnavailable { attempts: 30 }))
        ));
        assert_eq!(store.bulk_requests(), 0);
    }

    #[tokio::test]
    async fn test_invalid_spec_aborts_before_store_access() {
        let store = Arc::new(InMemorySearchStore::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let plan = BurstPlan::populate(t()).with_spec(BurstSpec::new(3, t(), t() - Duration::seconds(5)));

        let result = runner(store.clone(), sleeper)
            .run(&plan, &mut StdRng::seed_from_u64(0))
            .await;

        assert!(matches!(result, Err(RunError::Spec(_))));
        assert_eq!(store.health_checks(), 0);
    }

    #[test]
    fn test_plan_defaults() {
        let populate = BurstPlan::populate(t());
        assert_eq!(populate.spec.count, 6);
        assert_eq!(populate.spec.window_end, t());
        assert_eq!(populate.expected_minimum(), 6);
        assert!(populate.create_indices);

        let burst = BurstPlan::burst(t());
        assert_eq!(burst.spec.count, 15);
        assert_eq!(burst.spec.distribution, Distribution::Random);
        assert_eq!(burst.expected_minimum(), 5);
        assert_eq!(burst.verify_level, Some(LogLevel::Error));
    }
}
