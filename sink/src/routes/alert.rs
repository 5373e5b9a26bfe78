//! Alert receiver endpoint.
//!
//! Accepts alert notifications from the rule engine. The body is parsed
//! leniently: whatever arrives is recorded and acknowledged, and a body that
//! is empty, unreadable or not JSON is recorded without payload.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::models::alert::{parse_payload, AlertRecord};

/// Acknowledgment returned for every alert.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertAck {
    /// Always "received".
    pub status: String,
}

impl AlertAck {
    fn received() -> Self {
        Self {
            status: "received".to_string(),
        }
    }
}

/// Creates the alert routes.
pub fn alert_routes(state: AppState) -> Router {
    Router::new()
        .route("/enqueue/alert", post(receive_alert))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Records an alert and acknowledges it.
///
/// Never fails: a malformed body is logged and recorded as an empty payload.
async fn receive_alert(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<AlertAck> {
    let payload = match body {
        Ok(bytes) => match parse_payload(&bytes) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    body_len = bytes.len(),
                    "Malformed alert payload, recording as empty"
                );
                None
            }
        },
        Err(rejection) => {
            tracing::warn!(
                error = %rejection.body_text(),
                "Unreadable alert body, recording as empty"
            );
            None
        }
    };

    let record = AlertRecord::received(payload);
    let received_at = record.received_at;
    let pretty = record.payload_pretty();
    let seq = state.alerts().publish(record);

    tracing::info!(
        seq,
        %received_at,
        payload = %pretty,
        "Received alert"
    );

    Json(AlertAck::received())
}
