//! Burstcheck Shared Library
//!
//! This crate contains the pieces used to exercise a frequency-alerting
//! rule end to end: synthetic log events, burst scheduling, store access,
//! and post-write verification.
//!
//! # Modules
//!
//! - [`models`] - Log event, burst spec and alert record
//! - [`generator`] - Event synthesis and temporal scheduling
//! - [`store`] - Store trait with Elasticsearch and in-memory implementations
//! - [`submitter`] - Readiness polling and bulk submission
//! - [`probe`] - Post-write verification
//! - [`run`] - Preset plans and the runner tying it together
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use rand::{rngs::StdRng, SeedableRng};
//! use shared::generator::schedule;
//! use shared::models::BurstSpec;
//!
//! let spec = BurstSpec::ending_at(6, Utc::now(), Duration::seconds(60));
//! let events = schedule(&spec, &mut StdRng::seed_from_u64(1)).unwrap();
//!
//! assert_eq!(events.len(), 6);
//! assert!(events.iter().all(|e| e.validate_event().is_ok()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod generator;
pub mod models;
pub mod probe;
pub mod run;
pub mod store;
pub mod submitter;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use rand;
pub use serde_json;
