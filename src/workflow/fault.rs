//! Fault prediction for a single sensor reading.

use std::rc::Rc;

use chrono::Local;

use super::{RequestToken, RequestTracker, WorkflowError};
use crate::client::types::FAULT_FIELDS;
use crate::client::{BackendClient, ClientError, FaultSummary};
use crate::config::schema::InsightsConfig;
use crate::history::{FAULT_LOG, FieldValue, Fields, HistoryLog, LogEntry};
use crate::llm;
use crate::store::KeyValueStore;

const WORKFLOW: &str = "fault";

/// Form values the page starts with.
pub fn default_inputs() -> Fields {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    [
        ("bulbNumber", "101".to_string()),
        ("timestamp", timestamp),
        ("powerConsumption", "120".to_string()),
        ("voltageLevels", "230".to_string()),
        ("currentFluctuations", "5".to_string()),
        ("temperature", "25".to_string()),
        ("currentFluctuationsEnv", "3".to_string()),
        ("environmentalConditions", "Rainy".to_string()),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), FieldValue::from(value)))
    .collect()
}

/// Names of required form fields that are absent or blank.
pub fn missing_fields(inputs: &Fields) -> Vec<String> {
    FAULT_FIELDS
        .iter()
        .map(|(form_name, _)| *form_name)
        .filter(|name| match inputs.get(*name) {
            Some(FieldValue::Text(s)) => s.trim().is_empty(),
            Some(FieldValue::Number(_)) => false,
            None => true,
        })
        .map(str::to_string)
        .collect()
}

/// Log columns for a fault verdict: the binary label and the fault type.
pub fn log_results(summary: &FaultSummary) -> Fields {
    Fields::from([
        (
            "fault_prediction".to_string(),
            FieldValue::from(summary.binary.prediction.as_str()),
        ),
        (
            "fault_type".to_string(),
            FieldValue::from(summary.multiclass.prediction.as_str()),
        ),
    ])
}

pub struct FaultWorkflow {
    client: BackendClient,
    log: HistoryLog,
    tracker: RequestTracker,
    current: Option<FaultSummary>,
}

impl FaultWorkflow {
    pub fn new(client: BackendClient, store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            log: HistoryLog::open(store, FAULT_LOG),
            tracker: RequestTracker::new(),
            current: None,
        }
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut HistoryLog {
        &mut self.log
    }

    pub fn current(&self) -> Option<&FaultSummary> {
        self.current.as_ref()
    }

    /// Validate the form and start a submission.
    ///
    /// A form with blank fields is refused before any token is issued, so an
    /// in-flight request stays current.
    pub fn begin(&mut self, inputs: &Fields) -> Result<RequestToken, WorkflowError> {
        let missing = missing_fields(inputs);
        if !missing.is_empty() {
            return Err(WorkflowError::MissingFields(missing));
        }
        self.current = None;
        Ok(self.tracker.issue())
    }

    pub fn finish(
        &mut self,
        token: RequestToken,
        inputs: Fields,
        response: Result<FaultSummary, ClientError>,
    ) -> Result<FaultSummary, WorkflowError> {
        self.tracker.accept(WORKFLOW, token)?;
        let summary = response?;
        self.log.append(LogEntry::new(inputs, log_results(&summary)));
        self.current = Some(summary.clone());
        Ok(summary)
    }

    pub fn submit(&mut self, inputs: Fields) -> Result<FaultSummary, WorkflowError> {
        let token = self.begin(&inputs)?;
        let response = self.client.predict_fault(&inputs);
        self.finish(token, inputs, response)
    }

    pub fn replay(&self, index: usize) -> Option<Fields> {
        self.log
            .entry(index)
            .map(|entry| HistoryLog::select_entry(entry).clone())
    }

    /// Ask for diagnostic steps. Only offered when the verdict is a fault.
    pub fn insights(&self, config: &InsightsConfig) -> Result<String, WorkflowError> {
        let summary = self.current.as_ref().ok_or(WorkflowError::NoResult)?;
        if !summary.is_fault() {
            return Err(WorkflowError::NotAFault);
        }
        let prompt = llm::prompts::fault_steps(&summary.multiclass.prediction);
        Ok(llm::generate_text(config, &prompt))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
