//! Alert sink route definitions.

mod alert;
mod health;

pub use alert::{alert_routes, AlertAck};
pub use health::health_routes;
