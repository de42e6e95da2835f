//! Energy-demand forecasting.

use std::rc::Rc;

use chrono::Local;

use super::{RequestToken, RequestTracker, WorkflowError};
use crate::client::{BackendClient, ClientError, EnergyPrediction};
use crate::config::schema::InsightsConfig;
use crate::history::{ENERGY_LOG, FieldValue, Fields, HistoryLog, LogEntry};
use crate::llm;
use crate::store::KeyValueStore;

const WORKFLOW: &str = "energy";

/// Result column holding the mean of all model predictions.
pub const AVG_PREDICTION: &str = "avgPrediction";

/// Form values the page starts with.
pub fn default_inputs() -> Fields {
    Fields::from([
        (
            "timestamp".to_string(),
            FieldValue::from(Local::now().format("%Y-%m-%d %H:%M").to_string()),
        ),
        ("lag_24h".to_string(), FieldValue::from(135.5)),
        ("Temp".to_string(), FieldValue::from(22.5)),
        ("RH".to_string(), FieldValue::from(55.0)),
        ("FF".to_string(), FieldValue::from(15.0)),
        ("P".to_string(), FieldValue::from(1012.0)),
    ])
}

/// Flatten a forecast into log columns: the timestamp, one column per model,
/// and [`AVG_PREDICTION`] as two-decimal text.
pub fn log_results(prediction: &EnergyPrediction) -> Fields {
    let mut results = Fields::new();
    results.insert(
        "timestamp".to_string(),
        FieldValue::from(prediction.timestamp.as_str()),
    );
    for (model, value) in &prediction.predictions {
        results.insert(model.clone(), FieldValue::from(*value));
    }
    results.insert(
        AVG_PREDICTION.to_string(),
        FieldValue::from(prediction.average_display()),
    );
    results
}

pub struct EnergyWorkflow {
    client: BackendClient,
    log: HistoryLog,
    tracker: RequestTracker,
    current: Option<(Fields, EnergyPrediction)>,
}

impl EnergyWorkflow {
    pub fn new(client: BackendClient, store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            log: HistoryLog::open(store, ENERGY_LOG),
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

    /// Latest applied forecast and the inputs it was made from.
    pub fn current(&self) -> Option<&(Fields, EnergyPrediction)> {
        self.current.as_ref()
    }

    /// Start a submission: clears the displayed result.
    pub fn begin(&mut self) -> RequestToken {
        self.current = None;
        self.tracker.issue()
    }

    /// Apply the backend's answer to the submission identified by `token`.
    ///
    /// On success the entry is appended to the log. A failed or superseded
    /// response leaves the log untouched.
    pub fn finish(
        &mut self,
        token: RequestToken,
        inputs: Fields,
        response: Result<EnergyPrediction, ClientError>,
    ) -> Result<EnergyPrediction, WorkflowError> {
        self.tracker.accept(WORKFLOW, token)?;
        let prediction = response?;
        self.log
            .append(LogEntry::new(inputs.clone(), log_results(&prediction)));
        self.current = Some((inputs, prediction.clone()));
        Ok(prediction)
    }

    /// Send the form and apply the answer.
    pub fn submit(&mut self, inputs: Fields) -> Result<EnergyPrediction, WorkflowError> {
        let token = self.begin();
        let response = self.client.predict_energy(&inputs);
        self.finish(token, inputs, response)
    }

    /// Inputs of the log row at `index`, to refill the form.
    pub fn replay(&self, index: usize) -> Option<Fields> {
        self.log
            .entry(index)
            .map(|entry| HistoryLog::select_entry(entry).clone())
    }

    /// Ask for an operator action plan for the current forecast.
    pub fn insights(&self, config: &InsightsConfig) -> Result<String, WorkflowError> {
        let (inputs, prediction) = self.current.as_ref().ok_or(WorkflowError::NoResult)?;
        let prompt = llm::prompts::energy_insights(prediction, inputs);
        Ok(llm::generate_text(config, &prompt))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
