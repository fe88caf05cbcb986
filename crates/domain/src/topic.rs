//! Well-known topic names.
//!
//! Topics are plain strings, hierarchical by convention only — the bus
//! matches them with exact equality. The constants here are the contracts
//! between the core and its adapters; the two helper functions build the
//! per-path and per-request correlation topics the HTTP bridge uses.

/// A component reporting a new fact (`KeyValue`).
pub const STATE_UPDATE: &str = "state:update";

/// Retract a fact; the `Value` payload carries the key to remove.
pub const STATE_DELETE: &str = "state:delete";

/// Periodic tick for schedule-driven adapters (`Value` = RFC3339 timestamp).
pub const EVERY_MINUTE: &str = "every:minute";

/// Structured log sink (`KeyValue` = level, message).
pub const LOG_NEW: &str = "log:new";

/// Outbound notification request (`Email`).
pub const EMAIL_SEND: &str = "email:send";

/// An adapter declares it will answer HTTP requests at a path (`Value` = path).
pub const HTTP_REGISTER_PATH: &str = "http:register-path";

/// Topic the bridge publishes an inbound request for `path` on.
#[must_use]
pub fn http_request(path: &str) -> String {
    format!("http-request:{path}")
}

/// Correlation topic for the response to the request identified by `id`.
#[must_use]
pub fn http_response(id: &str) -> String {
    format!("http-response:{id}")
}
