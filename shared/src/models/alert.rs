//! Received alert notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An alert as received by the sink.
///
/// The payload is kept opaque. It is `None` when the sender posted an empty
/// or unparsable body; such alerts are still recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// When the sink received the alert.
    pub received_at: DateTime<Utc>,
    /// The alert body, if it parsed as JSON.
    pub payload: Option<serde_json::Value>,
}

impl AlertRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn received(payload: Option<serde_json::Value>) -> Self {
        Self {
            received_at: Utc::now(),
            payload,
        }
    }

    /// Renders the payload as pretty-printed JSON, `null` when absent.
    #[must_use]
    pub fn payload_pretty(&self) -> String {
        match &self.payload {
            Some(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            None => "null".to_string(),
        }
    }
}

/// Parses an alert body.
///
/// Returns `Ok(None)` for an empty body.
///
/// # Errors
///
/// Returns the JSON error when a non-empty body is not valid JSON.
pub fn parse_payload(body: &[u8]) -> Result<Option<serde_json::Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some)
}
