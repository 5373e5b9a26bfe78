//! Message and status-code pools per severity level.
//!
//! The pools are process-wide and read-only. A level's messages and status
//! codes are chosen so that the fields of a generated event never
//! contradict each other (an `error` event never carries a `200`).

use crate::models::LogLevel;

const INFO_MESSAGES: &[&str] = &[
    "User login successful",
    "Request processed successfully",
    "Database connection established",
    "Cache hit for key: user_profile_123",
    "File uploaded successfully",
    "Email sent to user@example.com",
    "API rate limit check passed",
    "Session created for user",
    "Configuration loaded successfully",
    "Health check passed",
];

const WARNING_MESSAGES: &[&str] = &[
    "High memory usage detected",
    "Database connection pool running low",
    "Slow query detected",
    "Cache miss rate increasing",
    "Disk space running low",
    "API response time above threshold",
    "Too many failed login attempts",
    "Rate limit approaching",
    "Backup job running longer than usual",
    "SSL certificate expiring soon",
];

const ERROR_MESSAGES: &[&str] = &[
    "Database connection failed",
    "Database connection timeout",
    "Authentication failed for user",
    "Authentication service unavailable",
    "File not found: /var/log/app.log",
    "File system read error",
    "Invalid JSON format in request",
    "Timeout while processing request",
    "Memory allocation failed",
    "Network connection refused",
    "Permission denied for file access",
    "Service unavailable",
    "Service discovery failed",
    "Load balancer health check failed",
    "Cache corruption detected",
    "SSL handshake failed",
    "API rate limit exceeded",
    "Internal server error occurred",
];

const INFO_STATUS_CODES: &[u16] = &[200, 201, 204];
const WARNING_STATUS_CODES: &[u16] = &[400, 401, 403, 404, 429];
const ERROR_STATUS_CODES: &[u16] = &[500, 502, 503, 504];

/// Returns the message templates for a level.
#[must_use]
pub fn messages(level: LogLevel) -> &'static [&'static str] {
    match level {
        LogLevel::Info => INFO_MESSAGES,
        LogLevel::Warning => WARNING_MESSAGES,
        LogLevel::Error => ERROR_MESSAGES,
    }
}

/// Returns the HTTP status codes an event of this level may carry.
#[must_use]
pub fn status_codes(level: LogLevel) -> &'static [u16] {
    match level {
        LogLevel::Info => INFO_STATUS_CODES,
        LogLevel::Warning => WARNING_STATUS_CODES,
        LogLevel::Error => ERROR_STATUS_CODES,
    }
}
