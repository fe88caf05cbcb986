//! # homebus-domain
//!
//! Pure domain model for the homebus integration hub.
//!
//! ## Responsibilities
//! - Define **Events** — a topic string paired with exactly one payload variant
//! - Define the **Payload** sum type so consumers can never misread an
//!   unpopulated field
//! - Define the well-known **topic** names and helpers for the correlation
//!   topics the HTTP bridge uses
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.

pub mod event;
pub mod topic;
