//! In-process event bus — topic-keyed fan-out over bounded queues.
//!
//! Producers publish into a single bounded intake queue and block when it is
//! full (the deliberate backpressure point). One dispatch loop drains the
//! intake and pushes each event onto every subscriber queue registered for
//! its topic with a non-blocking send: a full subscriber queue means the
//! event is dropped *for that subscriber only* and a `log:new` diagnostic is
//! emitted. One overloaded consumer can never stall the loop or starve its
//! peers.
//!
//! Teardown is indirect on purpose: `Subscription::close` signals a bounded
//! unregister channel and a background reaper mutates the registration
//! table, so closing never contends with the read lock the dispatch loop
//! holds on the hot path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use homebus_domain::event::{Event, Payload};
use homebus_domain::topic;

/// How often [`EventBus::wait_until_subscriber`] re-checks the table.
const SUBSCRIBER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Queue capacities for a bus instance.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Capacity of the shared publish intake queue. A full intake blocks
    /// publishers rather than dropping events.
    pub intake_capacity: usize,
    /// Capacity of each per-subscriber delivery queue. A full subscriber
    /// queue drops events for that subscriber only.
    pub subscription_capacity: usize,
    /// Capacity of the unregister signal channel drained by the reaper.
    pub unregister_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 200,
            subscription_capacity: 100,
            unregister_capacity: 100,
        }
    }
}

/// Errors surfaced by bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus has been shut down; no further events will be delivered.
    #[error("the bus is closed")]
    Closed,
    /// No subscriber appeared on a topic within the allowed wait.
    #[error("no subscribers on topic {topic} after {waited:?}")]
    NoSubscriber {
        /// The topic that was being waited on.
        topic: String,
        /// How long the caller waited before giving up.
        waited: Duration,
    },
}

/// One registered subscriber: its id and the sending half of its queue.
struct SubscriberSlot {
    id: Uuid,
    tx: mpsc::Sender<Payload>,
}

/// State shared between the bus handles, the dispatch loop, and the reaper.
struct Shared {
    registry: RwLock<HashMap<String, Vec<SubscriberSlot>>>,
    intake_tx: mpsc::Sender<Event>,
    unregister_tx: mpsc::Sender<Uuid>,
    subscription_capacity: usize,
    closed: AtomicBool,
}

impl Shared {
    fn read_registry(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<SubscriberSlot>>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<SubscriberSlot>>> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn publish(&self, event: Event) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        self.intake_tx
            .send(event)
            .await
            .map_err(|_| BusError::Closed)
    }

    /// Remove the registration with this id, pruning topics whose
    /// subscriber list becomes empty.
    fn prune(&self, id: Uuid) {
        let mut registry = self.write_registry();
        for slots in registry.values_mut() {
            if let Some(idx) = slots.iter().position(|slot| slot.id == id) {
                slots.swap_remove(idx);
            }
        }
        registry.retain(|_, slots| !slots.is_empty());
    }
}

/// Cheaply cloneable handle to the bus.
///
/// Every component holds one of these (constructor-injected, never a
/// process-wide singleton) and talks to its peers exclusively through it.
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    /// Create a bus and the [`Dispatcher`] that drives it.
    ///
    /// The caller is expected to spawn `dispatcher.run()`; nothing is
    /// delivered until it is running. The unregistration reaper is spawned
    /// here.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime (the reaper task is
    /// spawned immediately).
    #[must_use]
    pub fn new(config: &BusConfig) -> (Self, Dispatcher) {
        let (intake_tx, intake_rx) = mpsc::channel(config.intake_capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(config.unregister_capacity);

        let shared = Arc::new(Shared {
            registry: RwLock::new(HashMap::new()),
            intake_tx,
            unregister_tx,
            subscription_capacity: config.subscription_capacity,
            closed: AtomicBool::new(false),
        });

        tokio::spawn(reap(Arc::clone(&shared), unregister_rx));

        let dispatcher = Dispatcher {
            shared: Arc::clone(&shared),
            intake_rx,
        };

        (Self { shared }, dispatcher)
    }

    /// Enqueue an event for dispatch.
    ///
    /// Suspends the caller while the intake queue is full — publishers get
    /// backpressure, never silent drops.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] after [`EventBus::close`].
    pub async fn publish(&self, event: Event) -> Result<(), BusError> {
        self.shared.publish(event).await
    }

    /// A standalone publish handle for components that only produce.
    #[must_use]
    pub fn publisher(&self) -> Publisher {
        Publisher {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Register interest in `topic` and return the consumer-owned handle.
    ///
    /// The subscription only sees events published after this call — there
    /// is no replay buffer. It must be closed (or dropped) when no longer
    /// needed so the reaper can prune the registration.
    #[must_use]
    pub fn subscribe(&self, topic: impl Into<String>) -> Subscription {
        let topic = topic.into();
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.shared.subscription_capacity);

        if self.shared.is_closed() {
            // the send half is dropped right away, so the reader observes
            // end-of-stream instead of hanging on a dead bus
            drop(tx);
        } else {
            let mut registry = self.shared.write_registry();
            registry
                .entry(topic.clone())
                .or_default()
                .push(SubscriberSlot { id, tx });
        }

        Subscription {
            topic,
            id,
            rx,
            unregister_tx: self.shared.unregister_tx.clone(),
            shared: Arc::downgrade(&self.shared),
            closed: false,
        }
    }

    /// Number of live subscriptions registered on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.shared
            .read_registry()
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Poll until at least one subscriber exists on `topic`.
    ///
    /// Used for startup sequencing: a publisher that starts before its
    /// consumer would lose its early events, so the composition root gates
    /// on this before bringing adapters up.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NoSubscriber`] if none appears within `timeout`.
    pub async fn wait_until_subscriber(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<(), BusError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.subscriber_count(topic) > 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BusError::NoSubscriber {
                    topic: topic.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(SUBSCRIBER_POLL_INTERVAL).await;
        }
    }

    /// Shut the bus down. Idempotent.
    ///
    /// Every subscriber queue is closed so blocked readers observe
    /// end-of-stream; subsequent publishes fail with [`BusError::Closed`].
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // dropping the slots drops the send halves, which closes the queues
        self.shared.write_registry().clear();
    }
}

/// Publish-only handle, cloneable and cheap to pass into producer tasks.
#[derive(Clone)]
pub struct Publisher {
    shared: Arc<Shared>,
}

impl Publisher {
    /// Enqueue an event for dispatch; identical to [`EventBus::publish`].
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Closed`] after the bus has shut down.
    pub async fn publish(&self, event: Event) -> Result<(), BusError> {
        self.shared.publish(event).await
    }
}

/// A consumer's registered interest in one topic, backed by its own
/// bounded queue.
///
/// Owned exclusively by the consuming component. Typical use:
///
/// ```ignore
/// let mut sub = bus.subscribe(topic::EVERY_MINUTE);
/// while let Some(payload) = sub.recv().await {
///     // do things with payload
/// }
/// ```
pub struct Subscription {
    topic: String,
    id: Uuid,
    rx: mpsc::Receiver<Payload>,
    unregister_tx: mpsc::Sender<Uuid>,
    shared: Weak<Shared>,
    closed: bool,
}

impl Subscription {
    /// Receive the next payload, suspending while the queue is empty.
    ///
    /// Returns `None` once the bus has shut down or this subscription has
    /// been unregistered and its queue drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// The topic this subscription is registered on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The unique id of this subscription.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Unregister this subscription. Idempotent and fire-and-forget: the
    /// registration disappears within a bounded number of dispatch cycles,
    /// and anything still queued here is discarded, not re-delivered.
    ///
    /// Normally this only signals the reaper; if the unregister channel is
    /// full the registration is removed inline instead, so a backlogged
    /// reaper can never lose the signal and leak the slot.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match self.unregister_tx.try_send(self.id) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if let Some(shared) = self.shared.upgrade() {
                    shared.prune(self.id);
                }
            }
            Err(TrySendError::Closed(_)) => {
                // the reaper has gone away with the bus; nothing left to prune
                tracing::debug!(id = %self.id, topic = %self.topic, "unregister signal not delivered");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// The single dispatch loop. Created by [`EventBus::new`], consumed by
/// [`Dispatcher::run`].
pub struct Dispatcher {
    shared: Arc<Shared>,
    intake_rx: mpsc::Receiver<Event>,
}

impl Dispatcher {
    /// Drain the intake queue forever, fanning each event out to the
    /// subscribers registered on its topic.
    pub async fn run(mut self) {
        while let Some(event) = self.intake_rx.recv().await {
            if self.shared.is_closed() {
                break;
            }
            self.dispatch(&event);
        }
    }

    fn dispatch(&self, event: &Event) {
        // ids of subscribers whose queue was full, and of slots whose
        // receiver is already gone; both are handled after the read guard
        // is released so the loop never takes the write lock (or contends
        // with the intake) while dispatching
        let mut dropped = Vec::new();
        let mut stale = Vec::new();
        {
            let registry = self.shared.read_registry();
            if let Some(slots) = registry.get(&event.topic) {
                for slot in slots {
                    match slot.tx.try_send(event.payload.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => dropped.push(slot.id),
                        Err(TrySendError::Closed(_)) => stale.push(slot.id),
                    }
                }
            }
        }

        // a dead receiver whose unregister signal never reached the reaper
        // would otherwise sit in the table forever; unregister it here
        for id in stale {
            self.shared.prune(id);
        }

        for id in dropped {
            self.report_drop(&event.topic, id);
        }
    }

    /// A full subscriber queue is non-fatal: drop for that subscriber and
    /// self-describe the failure on `log:new`. The diagnostic itself must
    /// never block the loop, so it goes through `try_send`; drops on
    /// `log:new` itself only hit `tracing`, otherwise a congested log
    /// consumer would generate diagnostics about its own diagnostics.
    fn report_drop(&self, event_topic: &str, subscriber: Uuid) {
        tracing::warn!(topic = %event_topic, %subscriber, "subscriber queue full, discarding event");
        if event_topic == topic::LOG_NEW {
            return;
        }
        let message =
            format!("subscriber queue full, discarding event (topic: {event_topic} sub: {subscriber})");
        let diagnostic = Event::key_value(topic::LOG_NEW, "ERROR", message);
        let _ = self.shared.intake_tx.try_send(diagnostic);
    }
}

/// Drains unregister signals and removes the matching registrations under
/// the write lock, pruning topics whose subscriber list becomes empty.
async fn reap(shared: Arc<Shared>, mut unregister_rx: mpsc::Receiver<Uuid>) {
    while let Some(id) = unregister_rx.recv().await {
        shared.prune(id);
    }
}
