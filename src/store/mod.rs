//! Durable key-value store adapter.
//!
//! One named slot per key, holding a JSON-serialized value. Two backends
//! implement [`KeyValueStore`]: [`FileStore`] (one file per key, survives
//! restarts) and [`MemoryStore`] (ephemeral, used by tests and one-shot
//! sessions).
//!
//! [`load`] never fails: a missing, unreadable or corrupt slot yields the
//! caller's default. [`PersistentState`] keeps an in-process copy of one
//! slot in sync with the store and notifies observers on every change.

mod file;
mod memory;

use std::rc::Rc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::analytics::events;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Raw string storage keyed by name.
///
/// Implementations must make a completed `write` visible to every later
/// `read` of the same key.
pub trait KeyValueStore {
    /// Return the raw stored string, or `None` if the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`.
    fn write(&self, key: &str, raw: &str) -> Result<()>;
}

/// Load and deserialize the value stored under `key`.
///
/// Falls back to `default` when the slot is absent or blank, when the store
/// cannot be read, and when the stored text is not valid JSON for `T`.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    let raw = match store.read(key) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => return default,
        Err(e) => {
            events::log_store_failure(key, &e);
            return default;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            events::log_store_failure(key, &anyhow::Error::new(e).context("corrupt stored value"));
            default
        }
    }
}

/// Serialize `value` and write it under `key`.
pub fn save<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize value for '{key}'"))?;
    store.write(key, &json)
}

// ---------------------------------------------------------------------------
// Observable state
// ---------------------------------------------------------------------------

/// Handle returned by [`PersistentState::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

type Observer<T> = Box<dyn Fn(&T)>;

/// An in-process value mirrored into one store slot.
///
/// Every [`set`](Self::set) writes through to the store and then notifies
/// all observers before returning, so no reader ever sees a value that
/// observers have not been told about. A failed write is logged and
/// otherwise ignored: the in-memory value stays authoritative for the
/// session.
pub struct PersistentState<T> {
    key: String,
    store: Rc<dyn KeyValueStore>,
    value: T,
    observers: Vec<(SubscriptionId, Observer<T>)>,
    next_id: usize,
}

impl<T: Serialize + DeserializeOwned> PersistentState<T> {
    /// Open the slot `key`, loading its current value or `default`.
    pub fn open(store: Rc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let value = load(store.as_ref(), &key, default);
        Self::with_value(store, key, value)
    }

    /// Wrap a value the caller already loaded (and possibly normalized)
    /// without touching the store.
    pub fn with_value(store: Rc<dyn KeyValueStore>, key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            store,
            value,
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value, persist it, then notify observers.
    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Err(e) = save(self.store.as_ref(), &self.key, &self.value) {
            events::log_store_failure(&self.key, &e);
        }
        for (_, observer) in &self.observers {
            observer(&self.value);
        }
    }

    /// Derive the next value from the current one and [`set`](Self::set) it.
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value);
        self.set(next);
    }

    pub fn subscribe(&mut self, observer: impl Fn(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
