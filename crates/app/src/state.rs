//! The state store — latest known value per key, derived from bus traffic.
//!
//! Most components only ever read, so the writeable handle is held by the
//! [`crate::state_bus`] consumer alone and everyone else gets a
//! [`ReadOnlyState`] view.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset};

/// Read access to the materialized state.
///
/// The typed readers parse on read; absence of the key *and* a value that
/// fails to parse both surface as `None`, never as an error.
pub trait StateReader: Send + Sync {
    /// Latest raw value stored for `key`.
    fn read(&self, key: &str) -> Option<String>;

    /// Latest value for `key`, parsed as a float.
    fn read_f64(&self, key: &str) -> Option<f64>;

    /// Latest value for `key`, parsed as an RFC3339 timestamp.
    fn read_time(&self, key: &str) -> Option<DateTime<FixedOffset>>;
}

/// In-memory key/value store. Cloning shares the underlying map.
///
/// Entries live until a `state:delete` retracts them or the process exits;
/// there is no TTL.
#[derive(Clone, Default)]
pub struct MemoryState {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryState {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, overwriting any previous value.
    pub fn store(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Remove `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// A view of this store without the write operations.
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyState {
        ReadOnlyState {
            inner: self.clone(),
        }
    }
}

impl StateReader for MemoryState {
    fn read(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn read_f64(&self, key: &str) -> Option<f64> {
        self.read(key)?.parse().ok()
    }

    fn read_time(&self, key: &str) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.read(key)?).ok()
    }
}

/// Read-only handle over a shared [`MemoryState`].
#[derive(Clone)]
pub struct ReadOnlyState {
    inner: MemoryState,
}

impl StateReader for ReadOnlyState {
    fn read(&self, key: &str) -> Option<String> {
        self.inner.read(key)
    }

    fn read_f64(&self, key: &str) -> Option<f64> {
        self.inner.read_f64(key)
    }

    fn read_time(&self, key: &str) -> Option<DateTime<FixedOffset>> {
        self.inner.read_time(key)
    }
}
