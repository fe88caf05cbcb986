//! # homebus-app
//!
//! Application core — the event bus and the foundational consumers built
//! directly on top of it.
//!
//! ## Responsibilities
//! - [`bus`] — the topic multiplexer: bounded intake queue, per-subscriber
//!   bounded queues, the single dispatch loop, and subscription teardown
//! - [`state`] — the "latest value per key" store and its read-only view
//! - [`state_bus`] — the bus consumer that materializes `state:update` /
//!   `state:delete` traffic into the store
//! - [`logging`] — the bus-backed [`Logger`](logging::Logger) façade and the
//!   `log:new` sink
//! - [`timer`] — the `every:minute` tick publisher
//!
//! ## Dependency rule
//! Depends on `homebus-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod bus;
pub mod logging;
pub mod state;
pub mod state_bus;
pub mod timer;
