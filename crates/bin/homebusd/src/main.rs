//! # homebusd — homebus daemon
//!
//! Composition root that wires the bus, its core consumers, and the
//! configured adapters together, then serves the HTTP bridge.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env var overrides)
//! - Construct the event bus and spawn its dispatch loop
//! - Start the foundational consumers (log sink, state store, path registry)
//! - Gate on `wait_until_subscriber` before starting anything that publishes
//!   to those consumers — early events are silently lost otherwise
//! - Instantiate adapters by name via the static registry
//! - Bind the HTTP bridge and serve
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no bus or adapter logic belongs here.
//!
//! Unrecoverable startup errors (bad config, a core consumer that never
//! subscribed) terminate the process; everything after startup is handled
//! locally by the components.

mod config;
mod registry;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use homebus_adapter_http_bridge::paths::PathRegistry;
use homebus_adapter_http_bridge::state::{BridgeConfig, BridgeState};
use homebus_app::bus::{BusConfig, EventBus};
use homebus_app::state::MemoryState;
use homebus_app::{logging, state_bus, timer};
use homebus_domain::topic;

/// How long startup waits for each core consumer to register.
const STARTUP_WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let (bus, dispatcher) = EventBus::new(&BusConfig::default());
    tokio::spawn(dispatcher.run());

    // foundational consumers
    tokio::spawn(logging::run_log_sink(bus.clone()));

    let state = MemoryState::new();
    tokio::spawn(state_bus::run(bus.clone(), state.clone()));

    let paths = PathRegistry::new();
    tokio::spawn(homebus_adapter_http_bridge::paths::listen(
        bus.clone(),
        paths.clone(),
    ));

    for required in [topic::LOG_NEW, topic::STATE_UPDATE, topic::HTTP_REGISTER_PATH] {
        bus.wait_until_subscriber(required, STARTUP_WAIT).await?;
    }

    // adapters, now that the core consumers are guaranteed to be listening
    for section in config.adapter_sections()? {
        tracing::info!(section = section.name, adapter = section.adapter, "starting adapter");
        registry::spawn(&section, &bus)?;
    }

    tokio::spawn(timer::run_minute_ticker(bus.publisher()));

    let bridge = BridgeState::new(bus.clone(), paths, BridgeConfig::default());
    let app = homebus_adapter_http_bridge::router::build(bridge);

    let bind_addr = config.bind_addr();
    tracing::info!(%bind_addr, "homebusd listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
