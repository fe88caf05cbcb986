//! # homebus-adapter-http-bridge
//!
//! HTTP bridge — lets external HTTP requests inject events onto the bus and
//! synchronously await the bus-generated response.
//!
//! ## Responsibilities
//! - Track which URL paths some adapter has claimed (`http:register-path`)
//! - Per request: publish `http-request:<path>` with a fresh correlation id,
//!   then block the handler on `http-response:<id>` up to a fixed deadline
//! - Map the first matching response (or the deadline) onto the HTTP reply
//!
//! ## Dependency rule
//! Depends on `homebus-app` and `homebus-domain` only. Knows nothing about
//! what answers the requests.

pub mod bridge;
pub mod paths;
pub mod router;
pub mod state;
