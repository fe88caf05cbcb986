//! Bus consumer that materializes state traffic into the store.
//!
//! Subscribes to `state:update` and `state:delete` and is the only writer
//! to the shared [`MemoryState`]. Updates are idempotent: a value identical
//! to the stored one is not re-written and leaves no trace beyond the
//! publish itself.

use homebus_domain::event::Payload;
use homebus_domain::topic;

use crate::bus::EventBus;
use crate::logging::Logger;
use crate::state::{MemoryState, StateReader};

/// Consume state events until the bus shuts down.
pub async fn run(bus: EventBus, state: MemoryState) {
    let logger = Logger::new(&bus);
    let mut updates = bus.subscribe(topic::STATE_UPDATE);
    let mut deletes = bus.subscribe(topic::STATE_DELETE);

    loop {
        tokio::select! {
            payload = updates.recv() => match payload {
                Some(Payload::KeyValue { key, value }) => {
                    apply_update(&logger, &state, &key, value).await;
                }
                Some(_) => {} // wrong kind, not for us
                None => break,
            },
            payload = deletes.recv() => match payload {
                Some(Payload::Value { value: key }) => state.remove(&key),
                Some(_) => {}
                None => break,
            },
        }
    }
}

/// Store the value if the key is new or the value changed.
async fn apply_update(logger: &Logger, state: &MemoryState, key: &str, value: String) {
    if state.read(key).as_deref() == Some(value.as_str()) {
        return;
    }
    state.store(key, value.clone());
    logger.debug(format!("set {key} to {value}")).await;
}
