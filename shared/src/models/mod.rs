//! Data models for Burstcheck.
//!
//! This module contains the synthesized log event, the burst request that
//! shapes a run, and the record of a received alert.

pub mod alert;
pub mod burst;
pub mod event;

pub use alert::AlertRecord;
pub use burst::{BurstSpec, BurstSpecError, Distribution, LevelMix, DEFAULT_SERVICE};
pub use event::{EventValidationError, LogEvent, LogLevel};
