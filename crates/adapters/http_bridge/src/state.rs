//! Shared state handed to every bridge handler.

use std::time::Duration;

use homebus_app::bus::EventBus;

use crate::paths::PathRegistry;

/// Tunables for the request/response round-trip.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long a handler waits for an `http-response:<id>` event before
    /// answering 503.
    pub response_timeout: Duration,
    /// Request bodies above this size are rejected with 400 — a deliberate
    /// resource-exhaustion guard.
    pub max_body_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(2),
            max_body_bytes: 100 * 1024,
        }
    }
}

/// Axum state for the bridge router.
#[derive(Clone)]
pub struct BridgeState {
    /// Handle to the bus the requests are round-tripped over.
    pub bus: EventBus,
    /// Paths some adapter has registered interest in.
    pub paths: PathRegistry,
    /// Round-trip tunables.
    pub config: BridgeConfig,
}

impl BridgeState {
    /// Bundle the bridge dependencies into an axum state value.
    #[must_use]
    pub fn new(bus: EventBus, paths: PathRegistry, config: BridgeConfig) -> Self {
        Self { bus, paths, config }
    }
}
