//! Per-page glue between the forms, the backend client and the history logs.
//!
//! A workflow submits one form, appends the outcome to its own history log,
//! keeps the latest result for display and builds the insight prompt for it.
//! Every submission takes a [`RequestToken`]; a response is applied only if
//! its token is still the newest one its workflow issued.

use std::rc::Rc;

use thiserror::Error;

pub mod energy;
pub mod fault;
pub mod search;

pub use energy::EnergyWorkflow;
pub use fault::FaultWorkflow;
pub use search::{BulbForm, DatasetState, SearchWorkflow};

use crate::analytics::events;
use crate::client::{BackendClient, ClientError};
use crate::config::GridsightConfig;
use crate::config::schema::InsightsConfig;
use crate::history::{ENERGY_LOG, FAULT_LOG, HistoryLog};
use crate::store::{FileStore, KeyValueStore};

// ---------------------------------------------------------------------------
// Request tokens
// ---------------------------------------------------------------------------

/// Identifies one submission of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tokens and remembers the newest.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new submission. Every earlier token becomes stale.
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Accept `token` if it is the newest; otherwise log it as discarded.
    pub fn accept(&self, workflow: &str, token: RequestToken) -> Result<(), WorkflowError> {
        if self.is_current(token) {
            return Ok(());
        }
        events::log_stale_response(workflow, token.0, self.latest);
        Err(WorkflowError::Superseded {
            token: token.0,
            latest: self.latest,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a workflow step produced no new result.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Please fill in all fields. Missing: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{field} must be a number, got '{value}'")]
    InvalidField { field: String, value: String },

    #[error("no dataset file selected")]
    NoFileSelected,

    #[error("dataset not loaded; upload it before searching")]
    DatasetNotLoaded,

    #[error("nothing to analyse yet; run a prediction first")]
    NoResult,

    #[error("insights are only available when a fault is predicted")]
    NotAFault,

    /// A newer submission was issued before this response arrived.
    #[error("response {token} superseded by request {latest}")]
    Superseded { token: u64, latest: u64 },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl WorkflowError {
    /// Text shown inline next to the form.
    pub fn display_message(&self) -> String {
        match self {
            Self::Client(err) => err.display_message(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// All three workflows sharing one store and one backend client.
pub struct Dashboard {
    pub energy: EnergyWorkflow,
    pub fault: FaultWorkflow,
    pub search: SearchWorkflow,
    insights: InsightsConfig,
}

impl Dashboard {
    /// Open the dashboard against the on-disk store named by the config.
    pub fn open(config: &GridsightConfig) -> Self {
        let store: Rc<dyn KeyValueStore> = Rc::new(FileStore::from_config(&config.storage));
        Self::with_store(config, store)
    }

    /// Open the dashboard against an explicit store.
    pub fn with_store(config: &GridsightConfig, store: Rc<dyn KeyValueStore>) -> Self {
        let client = BackendClient::from_config(&config.backend);
        Self {
            energy: EnergyWorkflow::new(client.clone(), Rc::clone(&store)),
            fault: FaultWorkflow::new(client.clone(), store),
            search: SearchWorkflow::new(client),
            insights: config.insights.clone(),
        }
    }

    pub fn insights_config(&self) -> &InsightsConfig {
        &self.insights
    }

    /// History log by log name or workflow alias (`energy`, `fault`).
    pub fn history(&self, name: &str) -> Option<&HistoryLog> {
        match resolve_log_name(name)? {
            ENERGY_LOG => Some(self.energy.log()),
            _ => Some(self.fault.log()),
        }
    }

    pub fn history_mut(&mut self, name: &str) -> Option<&mut HistoryLog> {
        match resolve_log_name(name)? {
            ENERGY_LOG => Some(self.energy.log_mut()),
            _ => Some(self.fault.log_mut()),
        }
    }
}

/// Map a log name or workflow alias to the canonical log name.
pub fn resolve_log_name(name: &str) -> Option<&'static str> {
    match name {
        ENERGY_LOG | "energy" => Some(ENERGY_LOG),
        FAULT_LOG | "fault" | "faults" => Some(FAULT_LOG),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase_and_only_newest_is_current() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn accept_rejects_stale_token() {
        let mut tracker = RequestTracker::new();
        let stale = tracker.issue();
        let fresh = tracker.issue();
        assert!(tracker.accept("energy", fresh).is_ok());
        match tracker.accept("energy", stale) {
            Err(WorkflowError::Superseded { token, latest }) => {
                assert_eq!(token, 1);
                assert_eq!(latest, 2);
            }
            other => panic!("expected Superseded, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_message_lists_names() {
        let err = WorkflowError::MissingFields(vec!["timestamp".into(), "temperature".into()]);
        assert_eq!(
            err.display_message(),
            "Please fill in all fields. Missing: timestamp, temperature"
        );
    }

    #[test]
    fn log_names_and_aliases_resolve() {
        assert_eq!(resolve_log_name("energy"), Some(ENERGY_LOG));
        assert_eq!(resolve_log_name("faultPredictionLog"), Some(FAULT_LOG));
        assert_eq!(resolve_log_name("faults"), Some(FAULT_LOG));
        assert_eq!(resolve_log_name("search"), None);
    }

    #[test]
    fn dashboard_logs_are_isolated() {
        use crate::history::{FieldValue, Fields, LogEntry};
        use crate::store::MemoryStore;

        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let mut dashboard = Dashboard::with_store(&GridsightConfig::default(), store);
        let entry = LogEntry::new(
            Fields::from([("Temp".to_string(), FieldValue::from(20.0))]),
            Fields::new(),
        );
        dashboard.history_mut("energy").unwrap().append(entry);

        assert_eq!(dashboard.history("energy").unwrap().len(), 1);
        assert!(dashboard.history("fault").unwrap().is_empty());
        assert!(dashboard.history("nope").is_none());
    }

    #[test]
    fn client_error_message_uses_server_detail() {
        let err = WorkflowError::from(ClientError::Server {
            status: 422,
            detail: "timestamp: invalid format".to_string(),
        });
        assert_eq!(err.display_message(), "timestamp: invalid format");
    }
}
