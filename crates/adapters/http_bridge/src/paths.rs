//! Registry of URL paths adapters have claimed.
//!
//! Adapters announce the paths they answer by publishing
//! `http:register-path`; the bridge consults this registry to reject
//! everything else with 404 before touching the bus.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use homebus_app::bus::EventBus;
use homebus_app::logging::Logger;
use homebus_domain::event::Payload;
use homebus_domain::topic;

/// Shared set of registered paths. Cloning shares the set.
#[derive(Clone, Default)]
pub struct PathRegistry {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl PathRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that some adapter will answer requests at `path`.
    pub fn register(&self, path: impl Into<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    /// Whether any adapter has claimed `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }
}

/// Consume `http:register-path` events into the registry until the bus
/// shuts down.
pub async fn listen(bus: EventBus, registry: PathRegistry) {
    let logger = Logger::new(&bus);
    let mut sub = bus.subscribe(topic::HTTP_REGISTER_PATH);
    while let Some(payload) = sub.recv().await {
        let Payload::Value { value: path } = payload else {
            continue;
        };
        logger.debug(format!("http: registering path ({path})")).await;
        registry.register(path);
    }
}
