//! Bus-backed logging.
//!
//! Components log by publishing `log:new` events rather than writing
//! anywhere themselves; [`run_log_sink`] is the single consumer that
//! forwards them to the `tracing` subscriber. This keeps log output an
//! ordinary, observable piece of bus traffic.

use homebus_domain::event::{Event, Payload};
use homebus_domain::topic;

use crate::bus::{EventBus, Publisher};

/// Publishes `log:new` events on behalf of a component.
#[derive(Clone)]
pub struct Logger {
    publisher: Publisher,
}

impl Logger {
    /// Create a logger publishing on the given bus.
    #[must_use]
    pub fn new(bus: &EventBus) -> Self {
        Self {
            publisher: bus.publisher(),
        }
    }

    /// Log at DEBUG level.
    pub async fn debug(&self, message: impl Into<String>) {
        self.log("DEBUG", message).await;
    }

    /// Log at INFO level.
    pub async fn info(&self, message: impl Into<String>) {
        self.log("INFO", message).await;
    }

    /// Log at ERROR level.
    pub async fn error(&self, message: impl Into<String>) {
        self.log("ERROR", message).await;
    }

    /// Log an unrecoverable condition. The level is advisory — acting on it
    /// (usually by exiting) is the composition root's job.
    pub async fn fatal(&self, message: impl Into<String>) {
        self.log("FATAL", message).await;
    }

    async fn log(&self, level: &str, message: impl Into<String>) {
        let event = Event::key_value(topic::LOG_NEW, level, message);
        if self.publisher.publish(event).await.is_err() {
            // bus already shut down; nothing is listening any more
        }
    }
}

/// Consume `log:new` events and forward them to `tracing` until the bus
/// shuts down.
pub async fn run_log_sink(bus: EventBus) {
    let mut sub = bus.subscribe(topic::LOG_NEW);
    while let Some(payload) = sub.recv().await {
        let Payload::KeyValue {
            key: level,
            value: message,
        } = payload
        else {
            continue;
        };
        match level.as_str() {
            "DEBUG" => tracing::debug!(target: "homebus", "{message}"),
            "ERROR" | "FATAL" => tracing::error!(target: "homebus", "{message}"),
            _ => tracing::info!(target: "homebus", "{message}"),
        }
    }
}
