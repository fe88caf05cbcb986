//! Periodic tick publisher.
//!
//! Publishes `every:minute` events carrying the current RFC3339 timestamp
//! so schedule-driven adapters never roll their own sleep loops.

use std::time::Duration;

use chrono::Local;
use tokio::time::MissedTickBehavior;

use homebus_domain::event::Event;
use homebus_domain::topic;

use crate::bus::Publisher;

/// Publish an `every:minute` tick once a minute until the bus shuts down.
pub async fn run_minute_ticker(publisher: Publisher) {
    run_ticker(publisher, Duration::from_secs(60)).await;
}

/// Tick on an arbitrary period; the topic stays `every:minute` because the
/// topic name is the contract, not the cadence. Split out so tests can run
/// on a short period.
pub async fn run_ticker(publisher: Publisher, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick resolves immediately; the contract is one tick per
    // elapsed period
    interval.tick().await;

    loop {
        interval.tick().await;
        let now = Local::now().to_rfc3339();
        if publisher
            .publish(Event::value(topic::EVERY_MINUTE, now))
            .await
            .is_err()
        {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use homebus_domain::event::Payload;

    use super::*;
    use crate::bus::{BusConfig, EventBus};

    #[tokio::test]
    async fn should_publish_rfc3339_tick_each_period() {
        let (bus, dispatcher) = EventBus::new(&BusConfig::default());
        tokio::spawn(dispatcher.run());

        let mut sub = bus.subscribe(topic::EVERY_MINUTE);
        tokio::spawn(run_ticker(bus.publisher(), Duration::from_millis(10)));

        for _ in 0..2 {
            let Some(Payload::Value { value }) = sub.recv().await else {
                panic!("expected a value payload");
            };
            assert!(
                chrono::DateTime::parse_from_rfc3339(&value).is_ok(),
                "not RFC3339: {value}"
            );
        }
    }

    #[tokio::test]
    async fn should_stop_ticking_when_bus_closes() {
        let (bus, dispatcher) = EventBus::new(&BusConfig::default());
        tokio::spawn(dispatcher.run());

        let handle = tokio::spawn(run_ticker(bus.publisher(), Duration::from_millis(10)));
        bus.close();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ticker should exit once the bus is closed")
            .unwrap();
    }
}
