//! Bounded, persisted history of past predictions.
//!
//! Each workflow owns one log, identified by its log name, which is also the
//! store key. A log holds at most [`MAX_ENTRIES`] entries, newest first.
//! Appending to a full log silently drops the oldest entry.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::store::{self, KeyValueStore, PersistentState, SubscriptionId};

/// Maximum number of entries retained per log.
pub const MAX_ENTRIES: usize = 10;

/// Log name of the energy-demand workflow.
pub const ENERGY_LOG: &str = "energyPredictionLog";

/// Log name of the fault-prediction workflow.
pub const FAULT_LOG: &str = "faultPredictionLog";

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A raw form value or derived result: text or a number.
///
/// Serialized untagged, so stored JSON reads `"101"` or `22.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value. Text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Field name → value.
pub type Fields = BTreeMap<String, FieldValue>;

/// One past prediction: the inputs exactly as submitted, plus results the
/// caller derived from the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub inputs: Fields,
    pub results: Fields,
}

impl LogEntry {
    pub fn new(inputs: Fields, results: Fields) -> Self {
        Self { inputs, results }
    }

    /// Look a column up in `inputs` first, then in `results`.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.inputs.get(name).or_else(|| self.results.get(name))
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// A named, bounded, newest-first sequence of [`LogEntry`] values.
pub struct HistoryLog {
    state: PersistentState<Vec<LogEntry>>,
}

impl HistoryLog {
    /// Open the log stored under `log_name`, starting empty if nothing (or
    /// nothing readable) is stored.
    ///
    /// A stored sequence longer than [`MAX_ENTRIES`] is cut to the newest
    /// entries in memory.
    pub fn open(store: Rc<dyn KeyValueStore>, log_name: &str) -> Self {
        let mut entries: Vec<LogEntry> = store::load(store.as_ref(), log_name, Vec::new());
        entries.truncate(MAX_ENTRIES);
        Self {
            state: PersistentState::with_value(store, log_name, entries),
        }
    }

    pub fn name(&self) -> &str {
        self.state.key()
    }

    /// Prepend `entry`, drop anything past [`MAX_ENTRIES`], persist.
    pub fn append(&mut self, entry: LogEntry) {
        self.state.update(|current| {
            std::iter::once(entry)
                .chain(current.iter().take(MAX_ENTRIES - 1).cloned())
                .collect()
        });
    }

    /// Empty the log and persist the empty sequence.
    pub fn clear(&mut self) {
        self.state.set(Vec::new());
    }

    /// Current entries, newest first.
    pub fn get(&self) -> &[LogEntry] {
        self.state.get()
    }

    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    /// Entry at `index` (0 = newest).
    pub fn entry(&self, index: usize) -> Option<&LogEntry> {
        self.get().get(index)
    }

    /// Inputs of a past entry, for replaying into a form.
    pub fn select_entry(entry: &LogEntry) -> &Fields {
        &entry.inputs
    }

    /// Observe every change to this log.
    pub fn subscribe(&mut self, observer: impl Fn(&Vec<LogEntry>) + 'static) -> SubscriptionId {
        self.state.subscribe(observer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
