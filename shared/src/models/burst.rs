//! Burst generation request.
//!
//! A `BurstSpec` describes how many events to emit, the window their
//! timestamps must fall in and how they are spread across it.

use super::LogLevel;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default service tag for generated events.
pub const DEFAULT_SERVICE: &str = "web-server";

/// How timestamps are placed inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Evenly spaced, starting at the window start.
    Uniform,
    /// Independent uniform draws over the whole window.
    Random,
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Random => write!(f, "random"),
        }
    }
}

impl std::str::FromStr for Distribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "random" | "randomized" => Ok(Self::Random),
            other => Err(format!("unknown distribution: {other}")),
        }
    }
}

/// Level selection for a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelMix {
    /// Every event has this level.
    Fixed(LogLevel),
    /// Each event's level is drawn from a weighted mix of all levels.
    Mixed,
}

impl std::str::FromStr for LevelMix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("mixed") {
            return Ok(Self::Mixed);
        }
        s.parse::<LogLevel>().map(Self::Fixed)
    }
}

/// Errors for malformed burst specifications.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BurstSpecError {
    /// The window ends before it starts.
    #[error("Window end {end} precedes window start {start}")]
    InvertedWindow {
        /// Window start.
        start: DateTime<Utc>,
        /// Window end.
        end: DateTime<Utc>,
    },

    /// The window cannot be expressed in nanoseconds.
    #[error("Window of {0} is too long to schedule")]
    WindowTooLong(Duration),

    /// The count does not fit the scheduler's arithmetic.
    #[error("Event count {0} is too large")]
    CountTooLarge(usize),
}

fn clamp_overflow(offset: Duration) -> DateTime<Utc> {
    if offset < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    }
}

/// Configuration of one generation run.
///
/// # Example
///
/// ```
/// use shared::models::{BurstSpec, Distribution, LevelMix, LogLevel};
/// use chrono::{Duration, Utc};
///
/// let start = Utc::now() - Duration::seconds(60);
/// let spec = BurstSpec::new(6, start, start + Duration::seconds(60))
///     .with_distribution(Distribution::Uniform)
///     .with_level(LevelMix::Fixed(LogLevel::Error));
///
/// assert!(spec.validate_spec().is_ok());
/// assert_eq!(spec.window_length(), Duration::seconds(60));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstSpec {
    /// Number of events to emit.
    pub count: usize,
    /// Earliest allowed timestamp (inclusive).
    pub window_start: DateTime<Utc>,
    /// Latest allowed timestamp (inclusive).
    pub window_end: DateTime<Utc>,
    /// Timestamp placement.
    pub distribution: Distribution,
    /// Level selection.
    pub level: LevelMix,
    /// Service tag stamped on every event.
    pub service: String,
}

impl BurstSpec {
    /// Creates a uniform, error-only spec for the given window.
    #[must_use]
    pub fn new(count: usize, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Self {
        Self {
            count,
            window_start,
            window_end,
            distribution: Distribution::Uniform,
            level: LevelMix::Fixed(LogLevel::Error),
            service: DEFAULT_SERVICE.to_string(),
        }
    }

    /// Creates a spec whose window ends at `end` and spans `length`.
    ///
    /// A start before the representable range is clamped to it, and
    /// [`BurstSpec::validate_spec`] then rejects the window.
    #[must_use]
    pub fn ending_at(count: usize, end: DateTime<Utc>, length: Duration) -> Self {
        let start = end
            .checked_sub_signed(length)
            .unwrap_or_else(|| clamp_overflow(-length));
        Self::new(count, start, end)
    }

    /// Creates a spec whose window starts at `start` and spans `length`.
    ///
    /// An end past the representable range is clamped to it, and
    /// [`BurstSpec::validate_spec`] then rejects the window.
    #[must_use]
    pub fn starting_at(count: usize, start: DateTime<Utc>, length: Duration) -> Self {
        let end = start
            .checked_add_signed(length)
            .unwrap_or_else(|| clamp_overflow(length));
        Self::new(count, start, end)
    }

    /// Sets the timestamp distribution.
    #[must_use]
    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Sets the level selection.
    #[must_use]
    pub fn with_level(mut self, level: LevelMix) -> Self {
        self.level = level;
        self
    }

    /// Sets the service tag.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Returns `window_end - window_start`.
    #[must_use]
    pub fn window_length(&self) -> Duration {
        self.window_end - self.window_start
    }

    /// Returns true if `ts` lies inside the window, bounds included.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.window_start && ts <= self.window_end
    }

    /// Validates the spec.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The window end precedes the window start
    /// - The window length overflows nanosecond arithmetic
    /// - The count exceeds `i64::MAX`
    pub fn validate_spec(&self) -> Result<(), BurstSpecError> {
        if self.window_end < self.window_start {
            return Err(BurstSpecError::InvertedWindow {
                start: self.window_start,
                end: self.window_end,
            });
        }
        if self.window_length().num_nanoseconds().is_none() {
            return Err(BurstSpecError::WindowTooLong(self.window_length()));
        }
        if i64::try_from(self.count).is_err() {
            return Err(BurstSpecError::CountTooLarge(self.count));
        }
        Ok(())
    }
}
