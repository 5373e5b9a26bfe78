//! Temporal scheduler.
//!
//! Turns a [`BurstSpec`] into exactly `count` events whose timestamps lie in
//! `[window_start, window_end]`.

use super::synthesizer::generate_at;
use crate::models::{BurstSpec, BurstSpecError, Distribution, LevelMix, LogEvent, LogLevel};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Relative weights of info, warning and error events in a mixed burst.
pub const MIXED_LEVEL_WEIGHTS: [(LogLevel, u32); 3] = [
    (LogLevel::Info, 70),
    (LogLevel::Warning, 20),
    (LogLevel::Error, 10),
];

/// Schedules a burst.
///
/// Uniform mode places event `i` at `start + i * (L / count)`, where the
/// step is computed once in nanoseconds so the spacing is exact. Random
/// mode places each event at an independent offset in `0..=L`.
///
/// # Errors
///
/// Returns an error if the spec fails [`BurstSpec::validate_spec`].
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use rand::{rngs::StdRng, SeedableRng};
/// use shared::generator::schedule;
/// use shared::models::BurstSpec;
///
/// let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let spec = BurstSpec::starting_at(6, t, Duration::seconds(60));
/// let events = schedule(&spec, &mut StdRng::seed_from_u64(0)).unwrap();
///
/// assert_eq!(events.len(), 6);
/// assert_eq!(events[1].timestamp - events[0].timestamp, Duration::seconds(10));
/// ```
pub fn schedule<R: Rng + ?Sized>(
    spec: &BurstSpec,
    rng: &mut R,
) -> Result<Vec<LogEvent>, BurstSpecError> {
    spec.validate_spec()?;
    if spec.count == 0 {
        return Ok(Vec::new());
    }

    let timestamps = match spec.distribution {
        Distribution::Uniform => uniform_timestamps(spec)?,
        Distribution::Random => random_timestamps(spec, rng)?,
    };

    let events = timestamps
        .into_iter()
        .map(|ts| {
            let level = match spec.level {
                LevelMix::Fixed(level) => level,
                LevelMix::Mixed => mixed_level(&mut *rng),
            };
            generate_at(&mut *rng, level, &spec.service, ts)
        })
        .collect();

    Ok(events)
}

/// Draws a level according to [`MIXED_LEVEL_WEIGHTS`].
fn mixed_level<R: Rng + ?Sized>(rng: &mut R) -> LogLevel {
    let total: u32 = MIXED_LEVEL_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (level, weight) in MIXED_LEVEL_WEIGHTS {
        if roll < weight {
            return level;
        }
        roll -= weight;
    }
    MIXED_LEVEL_WEIGHTS[MIXED_LEVEL_WEIGHTS.len() - 1].0
}

/// Returns the spacing uniform mode uses for this spec.
///
/// # Errors
///
/// Returns an error if the spec fails [`BurstSpec::validate_spec`].
pub fn uniform_step(spec: &BurstSpec) -> Result<Duration, BurstSpecError> {
    spec.validate_spec()?;
    let (length, count) = nanos_and_count(spec)?;
    if count == 0 {
        return Ok(Duration::zero());
    }
    Ok(Duration::nanoseconds(length / count))
}

fn uniform_timestamps(spec: &BurstSpec) -> Result<Vec<DateTime<Utc>>, BurstSpecError> {
    let step = uniform_step(spec)?;
    let mut timestamps = Vec::with_capacity(spec.count);
    let mut ts = spec.window_start;
    for _ in 0..spec.count {
        timestamps.push(ts);
        ts += step;
    }
    Ok(timestamps)
}

fn random_timestamps<R: Rng + ?Sized>(
    spec: &BurstSpec,
    rng: &mut R,
) -> Result<Vec<DateTime<Utc>>, BurstSpecError> {
    let (length, _) = nanos_and_count(spec)?;
    Ok((0..spec.count)
        .map(|_| spec.window_start + Duration::nanoseconds(rng.gen_range(0..=length)))
        .collect())
}

fn nanos_and_count(spec: &BurstSpec) -> Result<(i64, i64), BurstSpecError> {
    let length = spec
        .window_length()
        .num_nanoseconds()
        .ok_or(BurstSpecError::WindowTooLong(spec.window_length()))?;
    let count = i64::try_from(spec.count).map_err(|_| BurstSpecError::CountTooLarge(spec.count))?;
    Ok((length, count))
}
