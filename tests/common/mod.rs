//! Canned HTTP backend for integration tests.
//!
//! Serves fixed JSON replies per path on an ephemeral port and records every
//! request it receives.

#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Response, Server, StatusCode};

use gridsight::config::GridsightConfig;

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub query: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct FakeBackend {
    pub url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeBackend {
    /// Start a server answering `path` with `(status, body)`. Unknown paths
    /// get a 404 with a `detail` message.
    pub fn start(routes: Vec<(&'static str, u16, String)>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake backend"));
        let addr = server.server_addr().to_ip().expect("fake backend has an IP address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = Vec::new();
                    let _ = request.as_reader().read_to_end(&mut body);
                    let url = request.url().to_string();
                    let (path, query) = match url.split_once('?') {
                        Some((p, q)) => (p.to_string(), q.to_string()),
                        None => (url.clone(), String::new()),
                    };
                    let content_type = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Content-Type"))
                        .map(|h| h.value.to_string())
                        .unwrap_or_default();
                    requests.lock().unwrap().push(Recorded {
                        method: request.method().to_string(),
                        path: path.clone(),
                        query,
                        content_type,
                        body,
                    });

                    let (status, reply) = routes
                        .iter()
                        .find(|(p, _, _)| *p == path)
                        .map(|(_, s, b)| (*s, b.clone()))
                        .unwrap_or((404, r#"{"detail": "Not Found"}"#.to_string()));
                    let response = Response::from_string(reply)
                        .with_status_code(StatusCode(status))
                        .with_header(
                            Header::from_bytes("Content-Type", "application/json").unwrap(),
                        );
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            url: format!("http://{addr}"),
            server,
            requests,
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Config pointing both the backend and the insights endpoint here.
    pub fn config(&self) -> GridsightConfig {
        let mut config = GridsightConfig::default();
        config.backend.url = self.url.clone();
        config.backend.timeout_ms = 2_000;
        config.insights.endpoint = self.url.clone();
        config.insights.api_key = "test-key".to_string();
        config.insights.model = "test-model".to_string();
        config.insights.timeout_ms = 2_000;
        config
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Canned replies
// ---------------------------------------------------------------------------

pub const ENERGY_PATH: &str = "/energy/predict";
pub const FAULT_PATH: &str = "/faults/predict";
pub const UPLOAD_PATH: &str = "/search/upload";
pub const SEARCH_PATH: &str = "/search/search";
pub const ADD_PATH: &str = "/search/search/add";
pub const GEMINI_PATH: &str = "/models/test-model:generateContent";

pub fn energy_reply() -> String {
    serde_json::json!({
        "timestamp": "2025-06-06 14:30",
        "predictions": {
            "random_forest": 27.0,
            "xgboost": 27.0,
            "lightgbm": 28.0,
            "gradient_boosting": 28.0,
            "lstm": 36.0
        }
    })
    .to_string()
}

pub fn fault_reply(verdict: &str) -> String {
    serde_json::json!({
        "binary": {
            "random_forest": {"prediction": verdict, "probability": 0.8765, "metrics": {}},
            "logistic_regression": {"prediction": "No Fault", "probability": 0.2, "metrics": {}}
        },
        "multiclass": {
            "random_forest": {
                "prediction": "Overheating",
                "probabilities": {"Overheating": 0.7, "Short Circuit": 0.3},
                "metrics": {}
            }
        }
    })
    .to_string()
}

pub fn search_reply() -> String {
    let row = |bulb: i64, power: f64, temp: f64, env: &str| {
        serde_json::json!({
            "bulb_number": bulb,
            "timestamp": "2023-10-27 14:31:05",
            "power_consumption (Watts)": power,
            "voltage_levels (Volts)": 220.0,
            "current_fluctuations (Amperes)": 0.68,
            "temperature (Celsius)": temp,
            "current_fluctuations_env (Amperes)": 0.1,
            "environmental_conditions": env,
            "distance": 0.01
        })
    };
    serde_json::json!({
        "query_timestamp": "2023-10-27 14:30:00",
        "elapsed_ms": 0.4,
        "neighbours": [
            row(101, 150.0, 45.0, "Clear"),
            row(102, 90.0, 30.0, "Cloudy"),
            row(210, 210.0, 60.0, "Rainy")
        ]
    })
    .to_string()
}

pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    })
    .to_string()
}

/// Every route answering successfully.
pub fn happy_routes() -> Vec<(&'static str, u16, String)> {
    vec![
        (ENERGY_PATH, 200, energy_reply()),
        (FAULT_PATH, 200, fault_reply("Fault")),
        (UPLOAD_PATH, 200, r#"{"message": "Dataset uploaded successfully"}"#.to_string()),
        (SEARCH_PATH, 200, search_reply()),
        (ADD_PATH, 200, r#"{"message": "Bulb entry added"}"#.to_string()),
        (GEMINI_PATH, 200, gemini_reply("Reduce load on feeder 3.")),
    ]
}
