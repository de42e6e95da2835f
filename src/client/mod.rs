//! HTTP client for the smart-grid prediction backend.
//!
//! Uses the synchronous `ureq` client with a fixed per-request timeout taken
//! from `[backend] timeout_ms` (default 10 s). Calls are single-shot: no
//! retry, no idempotency key. Each call returns a typed result or a
//! [`ClientError`] whose variant tells transport failures, non-2xx answers
//! and malformed bodies apart.
//!
//! Endpoints:
//!
//! | Call               | Method & path            |
//! |--------------------|--------------------------|
//! | energy forecast    | `POST /energy/predict`   |
//! | fault prediction   | `POST /faults/predict`   |
//! | dataset upload     | `POST /search/upload` (multipart) |
//! | timestamp search   | `POST /search/search`    |
//! | add a reading      | `POST /search/search/add`|

use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;

mod error;
pub mod multipart;
pub mod types;

pub use error::ClientError;
pub use types::{EnergyPrediction, FaultSummary, SearchResult, UploadConfirmation};

use crate::analytics::events;
use crate::config::schema::BackendConfig;
use crate::filter::NeighborRecord;
use crate::history::Fields;
use types::{BulbEntryBody, RawFaultResponse, RawSearchResponse};

const ENERGY_PATH: &str = "/energy/predict";
const FAULT_PATH: &str = "/faults/predict";
const UPLOAD_PATH: &str = "/search/upload";
const SEARCH_PATH: &str = "/search/search";
const ADD_BULB_PATH: &str = "/search/search/add";

/// Synchronous prediction-backend client.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forecast energy demand. `inputs` are the form values as entered.
    pub fn predict_energy(&self, inputs: &Fields) -> Result<EnergyPrediction, ClientError> {
        self.timed("energy", "predict", || self.post_json(ENERGY_PATH, inputs))
    }

    /// Predict a fault and reduce the response to the primary model, with
    /// probabilities as two-decimal percentages.
    pub fn predict_fault(&self, inputs: &Fields) -> Result<FaultSummary, ClientError> {
        let body = types::fault_request_body(inputs);
        self.timed("fault", "predict", || {
            self.post_json::<_, RawFaultResponse>(FAULT_PATH, &body)?
                .into_summary()
        })
    }

    /// Upload a dataset file for the search index. The backend decides when
    /// the dataset is ready; success here is the only signal.
    pub fn upload_dataset(
        &self,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadConfirmation, ClientError> {
        let (body, content_type) = multipart::build_file_body("file", file_name, content);
        self.timed("search", "upload", || {
            let resp = ureq::post(&self.endpoint(UPLOAD_PATH))
                .timeout(self.timeout)
                .set("Content-Type", &content_type)
                .send_bytes(&body)?;
            decode(resp)
        })
    }

    /// Find the readings closest to `timestamp` in the uploaded dataset.
    pub fn search(&self, timestamp: &str) -> Result<SearchResult, ClientError> {
        #[derive(Serialize)]
        struct SearchQuery<'a> {
            timestamp: &'a str,
        }

        self.timed("search", "query", || {
            self.post_json::<_, RawSearchResponse>(SEARCH_PATH, &SearchQuery { timestamp })?
                .into_result()
        })
    }

    /// Append a reading to the backend's search index.
    pub fn add_bulb(&self, record: &NeighborRecord) -> Result<String, ClientError> {
        self.timed("search", "add_bulb", || {
            let confirmation: UploadConfirmation =
                self.post_json(ADD_BULB_PATH, &BulbEntryBody::from(record))?;
            Ok(confirmation.message)
        })
    }

    // -- Internal --

    fn endpoint(&self, path: &str) -> String {
        let url = format!("{}{path}", self.base_url);
        // "localhost" may resolve to ::1 first while the backend binds IPv4 only.
        url.replace("://localhost", "://127.0.0.1")
    }

    fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = ureq::post(&self.endpoint(path))
            .timeout(self.timeout)
            .send_json(body)?;
        decode(resp)
    }

    /// Run a call and record its outcome and latency in the event log.
    fn timed<T>(
        &self,
        workflow: &str,
        call: &str,
        f: impl FnOnce() -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let start = Instant::now();
        let result = f();
        let latency_ms = start.elapsed().as_millis() as u64;
        let detail = result.as_ref().err().map(ToString::to_string);
        events::log_request(workflow, call, result.is_ok(), latency_ms, detail.as_deref());
        result
    }
}

fn decode<R: DeserializeOwned>(resp: ureq::Response) -> Result<R, ClientError> {
    resp.into_json()
        .map_err(|e| ClientError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
