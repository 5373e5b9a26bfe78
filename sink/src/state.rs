//! Application state module.
//!
//! Holds the in-process alert stream that route handlers publish to.

use shared::models::AlertRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Buffered alerts per subscriber before slow subscribers start lagging.
const STREAM_CAPACITY: usize = 256;

/// Observable stream of received alerts.
///
/// Every alert is published to all current subscribers. Nothing is kept
/// for subscribers that join later, and nothing survives the process.
#[derive(Debug, Clone)]
pub struct AlertStream {
    sender: broadcast::Sender<AlertRecord>,
    received: Arc<AtomicU64>,
}

impl AlertStream {
    /// Creates an empty stream.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            sender,
            received: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes to alerts published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AlertRecord> {
        self.sender.subscribe()
    }

    /// Publishes an alert and returns its sequence number (1-based).
    pub fn publish(&self, record: AlertRecord) -> u64 {
        let seq = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        // No subscribers is fine; the structured log is the primary record.
        let _ = self.sender.send(record);
        seq
    }

    /// Number of alerts received since start.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}

impl Default for AlertStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state shared across all request handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    alerts: AlertStream,
}

impl AppState {
    /// Creates a new application state with a fresh alert stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the alert stream.
    #[must_use]
    pub fn alerts(&self) -> &AlertStream {
        &self.alerts
    }
}
