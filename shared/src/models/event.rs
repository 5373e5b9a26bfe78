//! Log event data model.
//!
//! Defines the `LogEvent` document that is synthesized, indexed into the
//! store and read back by the verification probe.

use crate::generator::templates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Log severity level.
///
/// Only the three levels the alerting rule distinguishes are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational messages.
    Info,
    /// Warning conditions.
    Warning,
    /// Error conditions.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// A single synthetic log event.
///
/// Field names on the wire match the index mapping (`@timestamp`,
/// `user_id`, ...). Events are immutable once generated.
///
/// # Example
///
/// ```
/// use shared::models::{LogEvent, LogLevel};
/// use chrono::Utc;
///
/// let event = LogEvent {
///     timestamp: Utc::now(),
///     level: LogLevel::Error,
///     message: "Service unavailable".to_string(),
///     service: "web-server".to_string(),
///     user_id: "user_4242".to_string(),
///     ip_address: "192.168.1.17".to_string(),
///     response_time: 1.25,
///     status_code: 503,
/// };
///
/// assert!(event.validate_event().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogEvent {
    /// When the event occurred (UTC).
    #[serde(rename = "@timestamp", with = "timestamp_millis")]
    pub timestamp: DateTime<Utc>,

    /// Severity level.
    pub level: LogLevel,

    /// Message drawn from the level's template pool.
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,

    /// Service tag.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Synthetic user identifier (`user_NNNN`).
    #[validate(length(min = 1, message = "User id cannot be empty"))]
    pub user_id: String,

    /// Synthetic client address.
    #[validate(ip(v4, message = "IP address must be a dotted quad"))]
    pub ip_address: String,

    /// Response time in seconds.
    #[validate(range(min = 0.0, message = "Response time cannot be negative"))]
    pub response_time: f64,

    /// HTTP status code consistent with `level`.
    pub status_code: u16,
}

/// Errors reported by [`LogEvent::validate_event`].
#[derive(Debug, Error)]
pub enum EventValidationError {
    /// The message does not belong to the level's template pool.
    #[error("Message {message:?} is not a {level} template")]
    MessageMismatch {
        /// The event level.
        level: LogLevel,
        /// The offending message.
        message: String,
    },

    /// The status code is not plausible for the level.
    #[error("Status code {status_code} is not valid for level {level}")]
    StatusCodeMismatch {
        /// The event level.
        level: LogLevel,
        /// The offending status code.
        status_code: u16,
    },

    /// Field-level validation failed.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl LogEvent {
    /// Checks that all fields are populated and that `message` and
    /// `status_code` are consistent with `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A string field is empty or the IP address is malformed
    /// - The message is not one of the level's templates
    /// - The status code is outside the level's code set
    pub fn validate_event(&self) -> Result<(), EventValidationError> {
        self.validate()?;
        if !templates::messages(self.level).contains(&self.message.as_str()) {
            return Err(EventValidationError::MessageMismatch {
                level: self.level,
                message: self.message.clone(),
            });
        }
        if !templates::status_codes(self.level).contains(&self.status_code) {
            return Err(EventValidationError::StatusCodeMismatch {
                level: self.level,
                status_code: self.status_code,
            });
        }
        Ok(())
    }
}

/// Serializes timestamps as RFC 3339 with millisecond precision, the
/// resolution of the store's `date` type.
mod timestamp_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event(level: LogLevel, message: &str, status_code: u16) -> LogEvent {
        LogEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            level,
            message: message.to_string(),
            service: "web-server".to_string(),
            user_id: "user_1234".to_string(),
            ip_address: "192.168.1.10".to_string(),
            response_time: 0.5,
            status_code,
        }
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warning.to_string(), "warning");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_serialization() {
        assert_eq!(
            serde_json::to_string(&LogLevel::Warning).unwrap(),
            "\"warning\""
        );
        let level: LogLevel = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(level, LogLevel::Error);
    }

    #[test]
    fn test_event_serializes_with_index_field_names() {
        let event = sample_event(LogLevel::Error, "Service unavailable", 503);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["@timestamp"], "2024-01-01T12:00:00.000Z");
        assert_eq!(json["level"], "error");
        assert_eq!(json["user_id"], "user_1234");
        assert_eq!(json["ip_address"], "192.168.1.10");
        assert_eq!(json["status_code"], 503);
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_event_deserializes_store_source() {
        let json = r#"{
            "@timestamp": "2024-01-01T12:00:10Z",
            "level": "warning",
            "message": "Slow query detected",
            "service": "web-server",
            "user_id": "user_5555",
            "ip_address": "192.168.1.3",
            "response_time": 2.5,
            "status_code": 429
        }"#;

        let event: LogEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.level, LogLevel::Warning);
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 10).unwrap()
        );
        assert!(event.validate_event().is_ok());
    }

    #[test]
    fn test_validate_event_accepts_consistent_event() {
        let event = sample_event(LogLevel::Info, "Health check passed", 200);
        assert!(event.validate_event().is_ok());
    }

    #[test]
    fn test_validate_event_rejects_status_mismatch() {
        let event = sample_event(LogLevel::Error, "Service unavailable", 200);
        assert!(matches!(
            event.validate_event().unwrap_err(),
            EventValidationError::StatusCodeMismatch {
                status_code: 200,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_event_rejects_message_from_other_pool() {
        let event = sample_event(LogLevel::Error, "Health check passed", 500);
        assert!(matches!(
            event.validate_event().unwrap_err(),
            EventValidationError::MessageMismatch { .. }
        ));
    }

    #[test]
    fn test_validate_event_rejects_empty_service() {
        let mut event = sample_event(LogLevel::Info, "Health check passed", 200);
        event.service = String::new();
        assert!(matches!(
            event.validate_event().unwrap_err(),
            EventValidationError::ValidationError(_)
        ));
    }

    #[test]
    fn test_validate_event_rejects_bad_ip() {
        let mut event = sample_event(LogLevel::Info, "Health check passed", 200);
        event.ip_address = "not-an-ip".to_string();
        assert!(event.validate_event().is_err());
    }
}
