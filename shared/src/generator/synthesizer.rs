//! Event synthesizer.
//!
//! Builds fully populated [`LogEvent`]s from the template pools. All
//! randomness comes from the caller's generator, so a seeded `StdRng`
//! reproduces the same events.

use super::templates;
use crate::models::{LogEvent, LogLevel};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::ops::{Range, RangeInclusive};

/// Range of the numeric part of `user_id`.
pub const USER_ID_RANGE: RangeInclusive<u32> = 1000..=9999;

/// First three octets of every synthetic client address.
pub const SUBNET_PREFIX: &str = "192.168.1";

/// Range of the last octet of the client address.
pub const HOST_OCTET_RANGE: RangeInclusive<u8> = 1..=254;

/// Range of `response_time` in seconds.
pub const RESPONSE_TIME_RANGE: Range<f64> = 0.1..5.0;

/// Generates an event stamped with the current time.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, level: LogLevel, service: &str) -> LogEvent {
    generate_at(rng, level, service, Utc::now())
}

/// Generates an event with an explicit timestamp.
///
/// # Example
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use shared::generator::generate_at;
/// use shared::models::LogLevel;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let event = generate_at(&mut rng, LogLevel::Error, "web-server", chrono::Utc::now());
///
/// assert!(event.validate_event().is_ok());
/// assert!([500, 502, 503, 504].contains(&event.status_code));
/// ```
pub fn generate_at<R: Rng + ?Sized>(
    rng: &mut R,
    level: LogLevel,
    service: &str,
    timestamp: DateTime<Utc>,
) -> LogEvent {
    let messages = templates::messages(level);
    let codes = templates::status_codes(level);

    LogEvent {
        timestamp,
        level,
        message: messages[rng.gen_range(0..messages.len())].to_string(),
        service: service.to_string(),
        user_id: format!("user_{}", rng.gen_range(USER_ID_RANGE)),
        ip_address: format!("{SUBNET_PREFIX}.{}", rng.gen_range(HOST_OCTET_RANGE)),
        response_time: rng.gen_range(RESPONSE_TIME_RANGE),
        status_code: codes[rng.gen_range(0..codes.len())],
    }
}
