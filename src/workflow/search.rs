//! Nearest-timestamp search over an uploaded dataset.
//!
//! The dataset must be uploaded before searching. Selecting another file
//! clears the loaded flag, and an upload that finishes after a newer file
//! was selected does not mark the new file as loaded.

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::{RequestToken, RequestTracker, WorkflowError};
use crate::client::{BackendClient, ClientError, SearchResult, UploadConfirmation};
use crate::config::schema::InsightsConfig;
use crate::filter::{self, FilterForm, NeighborRecord};
use crate::llm;

const WORKFLOW: &str = "search";

// ---------------------------------------------------------------------------
// Dataset state
// ---------------------------------------------------------------------------

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Which file is selected and whether the backend has it.
#[derive(Debug, Default)]
pub struct DatasetState {
    file: Option<SelectedFile>,
    generation: u64,
    loaded: bool,
}

impl DatasetState {
    /// Pick a new file. The dataset is no longer considered loaded.
    pub fn select(&mut self, name: impl Into<String>, content: Vec<u8>) -> u64 {
        self.file = Some(SelectedFile {
            name: name.into(),
            content,
        });
        self.generation += 1;
        self.loaded = false;
        self.generation
    }

    /// The selected file and the selection it belongs to.
    pub fn selection(&self) -> Option<(u64, &SelectedFile)> {
        self.file.as_ref().map(|file| (self.generation, file))
    }

    /// Record a successful upload of selection `generation`. Ignored when a
    /// newer file has been selected since.
    pub fn mark_loaded(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.file.is_none() {
            return false;
        }
        self.loaded = true;
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Add-reading form
// ---------------------------------------------------------------------------

/// The add-reading form, as entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulbForm {
    pub bulb_number: String,
    pub timestamp: String,
    pub power_consumption: String,
    pub voltage_levels: String,
    pub current_fluctuations: String,
    pub temperature: String,
    pub current_fluctuations_env: String,
    pub environmental_conditions: String,
}

impl Default for BulbForm {
    fn default() -> Self {
        Self {
            bulb_number: String::new(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            power_consumption: String::new(),
            voltage_levels: String::new(),
            current_fluctuations: String::new(),
            temperature: String::new(),
            current_fluctuations_env: String::new(),
            environmental_conditions: "Clear".to_string(),
        }
    }
}

impl BulbForm {
    /// Parse the form into a typed reading.
    pub fn to_record(&self) -> Result<NeighborRecord, WorkflowError> {
        let required = [
            ("bulb_number", &self.bulb_number),
            ("timestamp", &self.timestamp),
            ("power_consumption", &self.power_consumption),
            ("voltage_levels", &self.voltage_levels),
            ("current_fluctuations", &self.current_fluctuations),
            ("temperature", &self.temperature),
            ("current_fluctuations_env", &self.current_fluctuations_env),
            ("environmental_conditions", &self.environmental_conditions),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::MissingFields(missing));
        }

        Ok(NeighborRecord {
            bulb_number: parse_number("bulb_number", &self.bulb_number)?,
            timestamp: self.timestamp.trim().to_string(),
            power_consumption: parse_number("power_consumption", &self.power_consumption)?,
            voltage_levels: parse_number("voltage_levels", &self.voltage_levels)?,
            current_fluctuations: parse_number("current_fluctuations", &self.current_fluctuations)?,
            temperature: parse_number("temperature", &self.temperature)?,
            current_fluctuations_env: parse_number(
                "current_fluctuations_env",
                &self.current_fluctuations_env,
            )?,
            environmental_conditions: self.environmental_conditions.trim().to_string(),
            distance: None,
        })
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, WorkflowError> {
    value
        .trim()
        .parse()
        .map_err(|_| WorkflowError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

pub struct SearchWorkflow {
    client: BackendClient,
    dataset: DatasetState,
    tracker: RequestTracker,
    results: Option<SearchResult>,
    filters: FilterForm,
}

impl SearchWorkflow {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            dataset: DatasetState::default(),
            tracker: RequestTracker::new(),
            results: None,
            filters: FilterForm::default(),
        }
    }

    pub fn dataset(&self) -> &DatasetState {
        &self.dataset
    }

    pub fn select_file(&mut self, name: impl Into<String>, content: Vec<u8>) {
        self.dataset.select(name, content);
    }

    /// Upload the selected file and mark it loaded on success.
    pub fn upload(&mut self) -> Result<UploadConfirmation, WorkflowError> {
        let (generation, file) = self
            .dataset
            .selection()
            .ok_or(WorkflowError::NoFileSelected)?;
        let confirmation = self.client.upload_dataset(&file.name, &file.content)?;
        self.dataset.mark_loaded(generation);
        Ok(confirmation)
    }

    /// Start a query. Refused locally while the dataset is not loaded.
    pub fn begin_query(&mut self) -> Result<RequestToken, WorkflowError> {
        if !self.dataset.is_loaded() {
            return Err(WorkflowError::DatasetNotLoaded);
        }
        self.results = None;
        Ok(self.tracker.issue())
    }

    pub fn finish_query(
        &mut self,
        token: RequestToken,
        response: Result<SearchResult, ClientError>,
    ) -> Result<SearchResult, WorkflowError> {
        self.tracker.accept(WORKFLOW, token)?;
        let result = response?;
        self.results = Some(result.clone());
        Ok(result)
    }

    /// Find the readings nearest to `timestamp`.
    pub fn query(&mut self, timestamp: &str) -> Result<SearchResult, WorkflowError> {
        let token = self.begin_query()?;
        let response = self.client.search(timestamp);
        self.finish_query(token, response)
    }

    pub fn results(&self) -> Option<&SearchResult> {
        self.results.as_ref()
    }

    pub fn filters(&self) -> &FilterForm {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: FilterForm) {
        self.filters = filters;
    }

    pub fn reset_filters(&mut self) {
        self.filters = FilterForm::default();
    }

    /// Current neighbours passing the current filters, in result order.
    pub fn filtered(&self) -> Vec<NeighborRecord> {
        self.results
            .as_ref()
            .map(|r| filter::apply(&r.neighbours, &self.filters.to_criteria()))
            .unwrap_or_default()
    }

    /// Append a reading to the search index. Returns the backend message.
    pub fn add_bulb(&self, form: &BulbForm) -> Result<String, WorkflowError> {
        let record = form.to_record()?;
        Ok(self.client.add_bulb(&record)?)
    }

    /// Ask for an analysis of the current neighbour cluster.
    pub fn insights(&self, config: &InsightsConfig) -> Result<String, WorkflowError> {
        let result = self.results.as_ref().ok_or(WorkflowError::NoResult)?;
        Ok(llm::generate_text(config, &llm::prompts::cluster_analysis(result)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackendConfig;

    fn workflow() -> SearchWorkflow {
        SearchWorkflow::new(BackendClient::from_config(&BackendConfig::default()))
    }

    fn record(bulb: i64, power: f64, env: &str) -> NeighborRecord {
        NeighborRecord {
            bulb_number: bulb,
            timestamp: "2023-10-27 14:31:05".to_string(),
            power_consumption: power,
            voltage_levels: 220.0,
            current_fluctuations: 0.68,
            temperature: 45.5,
            current_fluctuations_env: 0.1,
            environmental_conditions: env.to_string(),
            distance: Some(0.01),
        }
    }

    fn result() -> SearchResult {
        SearchResult {
            query_timestamp: "2023-10-27 14:30:00".to_string(),
            elapsed_ms: 14.583,
            neighbours: vec![
                record(101, 150.2, "Clear"),
                record(102, 149.9, "Rainy"),
                record(101, 155.6, "Rainy"),
            ],
        }
    }

    /// Force the loaded flag without a backend.
    fn loaded(wf: &mut SearchWorkflow) {
        let generation = wf.dataset.select("data.csv", b"a,b".to_vec());
        assert!(wf.dataset.mark_loaded(generation));
    }

    #[test]
    fn dataset_flag_lifecycle() {
        let mut state = DatasetState::default();
        assert!(!state.is_loaded());
        assert!(state.selection().is_none());

        let first = state.select("a.csv", vec![1]);
        assert!(state.mark_loaded(first));
        assert!(state.is_loaded());

        let second = state.select("b.csv", vec![2]);
        assert!(!state.is_loaded());
        assert!(!state.mark_loaded(first));
        assert!(!state.is_loaded());
        assert!(state.mark_loaded(second));
        assert_eq!(state.file_name(), Some("b.csv"));
    }

    #[test]
    fn upload_without_file_is_refused() {
        let mut wf = workflow();
        assert!(matches!(wf.upload(), Err(WorkflowError::NoFileSelected)));
    }

    #[test]
    fn query_is_refused_until_loaded() {
        let mut wf = workflow();
        assert!(matches!(
            wf.query("2023-10-27 14:30:00"),
            Err(WorkflowError::DatasetNotLoaded)
        ));
        wf.select_file("data.csv", Vec::new());
        assert!(matches!(wf.begin_query(), Err(WorkflowError::DatasetNotLoaded)));
    }

    #[test]
    fn stale_query_response_is_discarded() {
        let mut wf = workflow();
        loaded(&mut wf);
        let first = wf.begin_query().unwrap();
        let second = wf.begin_query().unwrap();

        wf.finish_query(second, Ok(result())).unwrap();
        let mut older = result();
        older.query_timestamp = "older".to_string();
        assert!(matches!(
            wf.finish_query(first, Ok(older)),
            Err(WorkflowError::Superseded { .. })
        ));
        assert_eq!(wf.results().unwrap().query_timestamp, "2023-10-27 14:30:00");
    }

    #[test]
    fn filters_apply_to_current_results() {
        let mut wf = workflow();
        assert!(wf.filtered().is_empty());

        loaded(&mut wf);
        let token = wf.begin_query().unwrap();
        wf.finish_query(token, Ok(result())).unwrap();
        assert_eq!(wf.filtered().len(), 3);

        wf.set_filters(FilterForm {
            env_cond: "rain".to_string(),
            power_min: "150".to_string(),
            ..FilterForm::default()
        });
        let kept = wf.filtered();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].power_consumption, 155.6);

        wf.reset_filters();
        assert_eq!(wf.filtered().len(), 3);
    }

    #[test]
    fn bulb_form_parses_into_record() {
        let form = BulbForm {
            bulb_number: "104".to_string(),
            timestamp: "2023-10-27 15:00:00".to_string(),
            power_consumption: "151.5".to_string(),
            voltage_levels: "221".to_string(),
            current_fluctuations: "0.7".to_string(),
            temperature: "44.9".to_string(),
            current_fluctuations_env: "0.2".to_string(),
            environmental_conditions: "Cloudy".to_string(),
        };
        let record = form.to_record().unwrap();
        assert_eq!(record.bulb_number, 104);
        assert_eq!(record.voltage_levels, 221.0);
        assert_eq!(record.environmental_conditions, "Cloudy");
        assert_eq!(record.distance, None);
    }

    #[test]
    fn bulb_form_reports_blank_and_invalid_fields() {
        let blank = BulbForm::default();
        match blank.to_record() {
            Err(WorkflowError::MissingFields(missing)) => {
                assert!(missing.contains(&"bulb_number".to_string()));
                assert!(!missing.contains(&"timestamp".to_string()));
                assert!(!missing.contains(&"environmental_conditions".to_string()));
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }

        let form = BulbForm {
            bulb_number: "1O1".to_string(),
            power_consumption: "1".to_string(),
            voltage_levels: "1".to_string(),
            current_fluctuations: "1".to_string(),
            temperature: "1".to_string(),
            current_fluctuations_env: "1".to_string(),
            ..BulbForm::default()
        };
        assert!(matches!(
            form.to_record(),
            Err(WorkflowError::InvalidField { ref field, .. }) if field == "bulb_number"
        ));
    }
}
