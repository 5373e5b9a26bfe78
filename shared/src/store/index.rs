//! Index naming and mapping.
//!
//! Events live in daily indices named `logs-YYYY.MM.DD` after the UTC date
//! of their own timestamp, so an index rolls over at UTC midnight. Writes
//! and reads both derive index names from here.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};

/// Prefix shared by all event indices.
pub const INDEX_PREFIX: &str = "logs-";

/// Returns the daily index an event with this timestamp belongs to.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use shared::store::index_for;
///
/// let ts = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
/// assert_eq!(index_for(ts), "logs-2024.01.01");
/// ```
#[must_use]
pub fn index_for(ts: DateTime<Utc>) -> String {
    index_for_date(ts.date_naive())
}

fn index_for_date(date: NaiveDate) -> String {
    format!("{INDEX_PREFIX}{}", date.format("%Y.%m.%d"))
}

/// Returns every daily index a window touches, oldest first.
///
/// An inverted window yields the index of `start` only.
#[must_use]
pub fn indices_for_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
    let first = start.date_naive();
    let last = end.date_naive().max(first);

    let mut indices = Vec::new();
    let mut day = first;
    while day <= last {
        indices.push(index_for_date(day));
        day += Duration::days(1);
    }
    indices
}

/// Joins index names into a multi-index target (`a,b,c`).
#[must_use]
pub fn target_for(indices: &[String]) -> String {
    indices.join(",")
}

/// Mapping used when creating an event index.
#[must_use]
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "@timestamp": {"type": "date"},
                "level": {"type": "keyword"},
                "message": {"type": "text"},
                "service": {"type": "keyword"},
                "user_id": {"type": "keyword"},
                "ip_address": {"type": "ip"},
                "response_time": {"type": "float"},
                "status_code": {"type": "integer"}
            }
        }
    })
}
