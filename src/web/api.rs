//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a JSON
//! [`HttpResponse`]. Workflow refusals become 4xx answers, backend failures
//! 502, with `{"error": message}` bodies the page shows inline.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::client::{EnergyPrediction, FaultSummary, SearchResult};
use crate::filter::{FilterForm, NeighborRecord};
use crate::history::{Fields, HistoryLog, LogEntry};
use crate::llm::{self, InsightKind};
use crate::workflow::{BulbForm, Dashboard, WorkflowError};

use super::{HttpResponse, content_type_json, error_response};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EnergyResponse<'a> {
    prediction: &'a EnergyPrediction,
    average: String,
    log: &'a [LogEntry],
}

#[derive(Serialize)]
struct FaultResponse<'a> {
    summary: &'a FaultSummary,
    is_fault: bool,
    no_fault_percent: f64,
    log: &'a [LogEntry],
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    result: &'a SearchResult,
    filtered: Vec<NeighborRecord>,
}

#[derive(Serialize)]
struct FilterResponse {
    total: usize,
    filtered: Vec<NeighborRecord>,
}

#[derive(Serialize)]
struct HistoryResponse<'a> {
    name: &'a str,
    entries: &'a [LogEntry],
}

#[derive(Serialize)]
struct InsightResponse {
    kind: String,
    text: String,
    error: bool,
}

#[derive(Deserialize)]
struct QueryRequest {
    timestamp: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// Parse a JSON request body; the error side is a rendered 400.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> std::result::Result<T, HttpResponse> {
    serde_json::from_slice(body)
        .map_err(|e| error_response(400, &format!("invalid JSON request body: {e}")))
}

/// Render a workflow refusal or failure.
fn workflow_error(err: &WorkflowError) -> HttpResponse {
    let status = match err {
        WorkflowError::Client(_) => 502,
        WorkflowError::Superseded { .. } => 409,
        _ => 400,
    };
    error_response(status, &err.display_message())
}

/// Read a query parameter from a URL, percent-decoded.
fn query_param(url: &str, name: &str) -> Option<String> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| percent_decode(v))
    })
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| raw.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match (escaped, bytes[i]) {
            (Some(b), _) => {
                out.push(b);
                i += 3;
                continue;
            }
            (None, b'+') => out.push(b' '),
            (None, b) => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `POST /api/energy/predict`: body: energy form fields.
pub fn post_energy(dashboard: &mut Dashboard, body: &[u8]) -> Result<HttpResponse> {
    let inputs: Fields = match parse_body(body) {
        Ok(inputs) => inputs,
        Err(resp) => return Ok(resp),
    };
    match dashboard.energy.submit(inputs) {
        Ok(prediction) => json_response(&EnergyResponse {
            average: prediction.average_display(),
            prediction: &prediction,
            log: dashboard.energy.log().get(),
        }),
        Err(e) => Ok(workflow_error(&e)),
    }
}

/// `POST /api/faults/predict`: body: fault form fields.
pub fn post_fault(dashboard: &mut Dashboard, body: &[u8]) -> Result<HttpResponse> {
    let inputs: Fields = match parse_body(body) {
        Ok(inputs) => inputs,
        Err(resp) => return Ok(resp),
    };
    match dashboard.fault.submit(inputs) {
        Ok(summary) => json_response(&FaultResponse {
            is_fault: summary.is_fault(),
            no_fault_percent: summary.no_fault_percent(),
            summary: &summary,
            log: dashboard.fault.log().get(),
        }),
        Err(e) => Ok(workflow_error(&e)),
    }
}

/// `POST /api/search/upload?name=<file>`: body: raw file bytes.
///
/// Selecting and uploading happen together, so the loaded flag always
/// describes the file sent here.
pub fn post_upload(dashboard: &mut Dashboard, url: &str, body: &[u8]) -> Result<HttpResponse> {
    let name = query_param(url, "name").unwrap_or_else(|| "dataset.csv".to_string());
    dashboard.search.select_file(name, body.to_vec());
    match dashboard.search.upload() {
        Ok(confirmation) => json_response(&serde_json::json!({
            "message": confirmation.message,
            "loaded": dashboard.search.dataset().is_loaded(),
            "file": dashboard.search.dataset().file_name(),
        })),
        Err(e) => Ok(workflow_error(&e)),
    }
}

/// `POST /api/search/query`: body: `{"timestamp": "..."}`.
pub fn post_query(dashboard: &mut Dashboard, body: &[u8]) -> Result<HttpResponse> {
    let req: QueryRequest = match parse_body(body) {
        Ok(req) => req,
        Err(resp) => return Ok(resp),
    };
    match dashboard.search.query(&req.timestamp) {
        Ok(result) => json_response(&SearchResponse {
            filtered: dashboard.search.filtered(),
            result: &result,
        }),
        Err(e) => Ok(workflow_error(&e)),
    }
}

/// `POST /api/search/filter`: body: the filter form. Filters the last
/// result locally; no backend call.
pub fn post_filter(dashboard: &mut Dashboard, body: &[u8]) -> Result<HttpResponse> {
    let form: FilterForm = match parse_body(body) {
        Ok(form) => form,
        Err(resp) => return Ok(resp),
    };
    dashboard.search.set_filters(form);
    json_response(&FilterResponse {
        total: dashboard
            .search
            .results()
            .map_or(0, |r| r.neighbours.len()),
        filtered: dashboard.search.filtered(),
    })
}

/// `POST /api/search/add`: body: the add-reading form.
pub fn post_add_bulb(dashboard: &mut Dashboard, body: &[u8]) -> Result<HttpResponse> {
    let form: BulbForm = match parse_body(body) {
        Ok(form) => form,
        Err(resp) => return Ok(resp),
    };
    match dashboard.search.add_bulb(&form) {
        Ok(message) => json_response(&serde_json::json!({ "message": message })),
        Err(e) => Ok(workflow_error(&e)),
    }
}

/// `GET /api/history/<log>`: newest-first entries.
pub fn get_history(dashboard: &mut Dashboard, log: &str) -> Result<HttpResponse> {
    match dashboard.history(log) {
        Some(history) => json_response(&HistoryResponse {
            name: history.name(),
            entries: history.get(),
        }),
        None => Ok(error_response(404, &format!("unknown log '{log}'"))),
    }
}

/// `DELETE /api/history/<log>`: clear the log.
pub fn delete_history(dashboard: &mut Dashboard, log: &str) -> Result<HttpResponse> {
    let Some(history) = dashboard.history_mut(log) else {
        return Ok(error_response(404, &format!("unknown log '{log}'")));
    };
    history.clear();
    json_response(&HistoryResponse {
        name: history.name(),
        entries: history.get(),
    })
}

/// `GET /api/history/<log>/<n>`: inputs of row `n`, to refill the form.
pub fn get_replay(dashboard: &mut Dashboard, log: &str, index: &str) -> Result<HttpResponse> {
    let Some(history) = dashboard.history(log) else {
        return Ok(error_response(404, &format!("unknown log '{log}'")));
    };
    let entry = index.parse::<usize>().ok().and_then(|i| history.entry(i));
    match entry {
        Some(entry) => json_response(HistoryLog::select_entry(entry)),
        None => Ok(error_response(404, &format!("no entry {index} in '{log}'"))),
    }
}

/// `POST /api/insights/<kind>`: narrative for the latest result of a
/// workflow. Generation failures come back as a sentinel text with
/// `error: true`.
pub fn post_insights(dashboard: &mut Dashboard, kind: &str) -> Result<HttpResponse> {
    let kind: InsightKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return Ok(error_response(404, &e)),
    };
    let config = dashboard.insights_config();
    let result = match kind {
        InsightKind::Energy => dashboard.energy.insights(config),
        InsightKind::Fault => dashboard.fault.insights(config),
        InsightKind::Cluster => dashboard.search.insights(config),
    };
    match result {
        Ok(text) => json_response(&InsightResponse {
            kind: kind.to_string(),
            error: llm::is_error(&text),
            text,
        }),
        Err(e) => Ok(workflow_error(&e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
