//! Axum router assembly for the bridge.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::BridgeState;

/// Build the bridge [`Router`].
///
/// `/health` answers locally; every other path falls through to the
/// correlation handler. Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build(state: BridgeState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .fallback(crate::bridge::handle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
