//! Persistence as an observer of store commits.
//!
//! Stores know nothing about storage. [`persist_on_change`] registers a
//! listener that serializes a partial view of the state after each commit and
//! writes it when it differs from the last write. [`rehydrate`] reads it back
//! at start.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use super::state::StateCell;
use crate::storage::{KeyValueStorage, StorageResult};

/// Format version written next to every persisted state.
pub const PERSIST_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    version: u32,
}

/// Writes `partialize(state)` under `key` after every commit that changes it.
/// Write failures are logged; they never fail the commit.
pub fn persist_on_change<S, P>(
    cell: &StateCell<S>,
    storage: Arc<dyn KeyValueStorage>,
    key: &'static str,
    partialize: fn(&S) -> P,
) where
    S: Clone + Send + Sync + 'static,
    P: Serialize + PartialEq + Send + 'static,
{
    let last_written: Mutex<Option<P>> = Mutex::new(Some(partialize(&cell.get())));

    cell.on_change(move |state| {
        let partial = partialize(state);
        let mut last = last_written.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(&partial) {
            return;
        }

        match write(storage.as_ref(), key, &partial) {
            Ok(()) => {
                debug!(key, "Persisted state");
                *last = Some(partial);
            }
            Err(e) => warn!(key, "Failed to persist state: {}", e),
        }
    });
}

/// Reads the state stored under `key`. Unreadable or corrupt state is
/// logged and treated as absent.
pub fn rehydrate<P: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<P> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, "Failed to read persisted state: {}", e);
            return None;
        }
    };

    match serde_json::from_str::<Envelope<P>>(&raw) {
        Ok(envelope) if envelope.version == PERSIST_VERSION => Some(envelope.state),
        Ok(envelope) => {
            warn!(key, version = envelope.version, "Discarding persisted state of unknown version");
            None
        }
        Err(e) => {
            warn!(key, "Discarding corrupt persisted state: {}", e);
            None
        }
    }
}

fn write<P: Serialize>(storage: &dyn KeyValueStorage, key: &str, state: &P) -> StorageResult<()> {
    let raw = serde_json::to_string(&Envelope {
        state,
        version: PERSIST_VERSION,
    })?;
    storage.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[derive(Clone, Default)]
    struct Counter {
        value: u32,
        transient: bool,
    }

    #[test]
    fn test_writes_only_when_partial_changes() {
        let storage = Arc::new(MemoryStorage::new());
        let cell = StateCell::new(Counter::default());
        persist_on_change(&cell, storage.clone(), "counter", |s: &Counter| s.value);

        cell.update(|s| s.transient = true);
        assert!(storage.is_empty());

        cell.update(|s| s.value = 3);
        assert_eq!(rehydrate::<u32>(storage.as_ref(), "counter"), Some(3));
    }

    #[test]
    fn test_envelope_format() {
        let storage = Arc::new(MemoryStorage::new());
        let cell = StateCell::new(Counter::default());
        persist_on_change(&cell, storage.clone(), "counter", |s: &Counter| s.value);

        cell.update(|s| s.value = 7);
        let raw = storage.get("counter").expect("get").expect("written");
        assert_eq!(raw, r#"{"state":7,"version":0}"#);
    }

    #[test]
    fn test_corrupt_state_is_ignored() {
        let storage = MemoryStorage::new();
        storage.set("counter", "{not json").expect("set");

        assert_eq!(rehydrate::<u32>(&storage, "counter"), None);
    }
}
