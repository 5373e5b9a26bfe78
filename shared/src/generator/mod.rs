//! Synthetic event generation.
//!
//! - [`templates`] - per-level message and status-code pools
//! - [`synthesizer`] - builds single events
//! - [`scheduler`] - places a burst of events inside a time window

pub mod scheduler;
pub mod synthesizer;
pub mod templates;

pub use scheduler::{schedule, uniform_step, MIXED_LEVEL_WEIGHTS};
pub use synthesizer::{generate, generate_at};
