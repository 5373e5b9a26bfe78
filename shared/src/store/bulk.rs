//! Bulk request encoding.

use super::index::index_for;
use crate::models::LogEvent;
use serde_json::json;

/// Encodes events as a bulk request body.
///
/// Each event becomes an `index` action line targeting its daily index,
/// followed by the document line. The body ends with a newline, as the
/// bulk endpoint requires.
///
/// # Errors
///
/// Returns an error if an event fails to serialize.
pub fn bulk_body(events: &[LogEvent]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for event in events {
        let action = json!({"index": {"_index": index_for(event.timestamp)}});
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(event)?);
        body.push('\n');
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_at;
    use crate::models::LogLevel;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bulk_body_pairs_actions_and_documents() {
        let mut rng = StdRng::seed_from_u64(0);
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let events = vec![
            generate_at(&mut rng, LogLevel::Error, "web-server", ts),
            generate_at(&mut rng, LogLevel::Info, "web-server", ts),
        ];

        let body = bulk_body(&events).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));

        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "logs-2024.01.01");

        let doc: LogEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc.timestamp, events[0].timestamp);
        assert_eq!(doc.message, events[0].message);
        assert_eq!(doc.status_code, events[0].status_code);
    }

    #[test]
    fn test_bulk_body_empty() {
        assert_eq!(bulk_body(&[]).unwrap(), "");
    }
}
