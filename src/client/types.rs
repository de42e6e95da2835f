/// Request and response shapes for the prediction backend, plus the
/// reshaping applied before results reach the workflows.
///
/// The backend speaks in unit-annotated field names
/// (`power_consumption__Watts`, `power_consumption (Watts)`); everything
/// past this module uses plain identifiers.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ClientError;
use crate::filter::NeighborRecord;
use crate::history::Fields;

/// Model whose fault verdict is surfaced on the dashboard.
pub const PRIMARY_FAULT_MODEL: &str = "random_forest";

/// Energy form fields, in display order. Names match the backend exactly.
pub const ENERGY_FIELDS: [&str; 6] = ["timestamp", "lag_24h", "Temp", "RH", "FF", "P"];

/// Fault form fields (camelCase, as the form stores them) and the backend
/// names they are sent under.
pub const FAULT_FIELDS: [(&str, &str); 8] = [
    ("bulbNumber", "bulb_number"),
    ("timestamp", "timestamp"),
    ("powerConsumption", "power_consumption__Watts"),
    ("voltageLevels", "voltage_levels__Volts"),
    ("currentFluctuations", "current_fluctuations__Amperes"),
    ("temperature", "temperature__Celsius"),
    ("currentFluctuationsEnv", "current_fluctuations_env__Amperes"),
    ("environmentalConditions", "environmental_conditions"),
];

// ---------------------------------------------------------------------------
// Energy
// ---------------------------------------------------------------------------

/// `POST /energy/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPrediction {
    pub timestamp: String,
    /// Model name → predicted demand (W).
    pub predictions: BTreeMap<String, f64>,
}

impl EnergyPrediction {
    /// Mean of all model predictions, or `None` when there are none.
    pub fn average(&self) -> Option<f64> {
        if self.predictions.is_empty() {
            return None;
        }
        Some(self.predictions.values().sum::<f64>() / self.predictions.len() as f64)
    }

    /// Average formatted with two decimals (`"27.20"`), `"0"` when empty.
    pub fn average_display(&self) -> String {
        self.average()
            .map_or_else(|| "0".to_string(), |avg| format!("{avg:.2}"))
    }
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// Map the fault form's raw values onto the backend's field names.
///
/// Values are forwarded as entered; the backend validates and coerces them.
/// Form keys the backend does not know are dropped.
pub fn fault_request_body(inputs: &Fields) -> Value {
    let mut body = Map::new();
    for (form_key, backend_key) in FAULT_FIELDS {
        if let Some(value) = inputs.get(form_key) {
            body.insert(
                backend_key.to_string(),
                serde_json::to_value(value).unwrap_or(Value::Null),
            );
        }
    }
    Value::Object(body)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFaultResponse {
    binary: BTreeMap<String, RawBinaryModel>,
    multiclass: BTreeMap<String, RawMulticlassModel>,
}

#[derive(Debug, Deserialize)]
struct RawBinaryModel {
    prediction: Value,
    probability: Option<f64>,
    #[serde(default)]
    metrics: Value,
}

#[derive(Debug, Deserialize)]
struct RawMulticlassModel {
    prediction: Value,
    #[serde(default)]
    probabilities: Option<BTreeMap<String, Option<f64>>>,
    #[serde(default)]
    metrics: Value,
}

/// Binary (fault / no fault) verdict of the primary model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryOutcome {
    pub prediction: String,
    /// Probability as a percentage, two decimals.
    pub probability: f64,
    pub metrics: Value,
}

/// Fault-type verdict of the primary model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MulticlassOutcome {
    pub prediction: String,
    /// Class name → probability percentage, two decimals.
    pub probabilities: BTreeMap<String, f64>,
    pub metrics: Value,
}

/// `POST /faults/predict` response reduced to the primary model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultSummary {
    pub binary: BinaryOutcome,
    pub multiclass: MulticlassOutcome,
}

impl FaultSummary {
    pub fn is_fault(&self) -> bool {
        self.binary.prediction == "Fault"
    }

    /// Complement of the fault probability, for the binary chart.
    pub fn no_fault_percent(&self) -> f64 {
        ((100.0 - self.binary.probability) * 100.0).round() / 100.0
    }
}

impl RawFaultResponse {
    pub(crate) fn into_summary(mut self) -> Result<FaultSummary, ClientError> {
        let binary = self.binary.remove(PRIMARY_FAULT_MODEL).ok_or_else(|| {
            ClientError::Decode(format!("no binary result for model '{PRIMARY_FAULT_MODEL}'"))
        })?;
        let multiclass = self.multiclass.remove(PRIMARY_FAULT_MODEL).ok_or_else(|| {
            ClientError::Decode(format!(
                "no multiclass result for model '{PRIMARY_FAULT_MODEL}'"
            ))
        })?;

        Ok(FaultSummary {
            binary: BinaryOutcome {
                prediction: label(&binary.prediction),
                probability: round_percent(binary.probability.unwrap_or(0.0)),
                metrics: binary.metrics,
            },
            multiclass: MulticlassOutcome {
                prediction: label(&multiclass.prediction),
                probabilities: multiclass
                    .probabilities
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(class, p)| (class, round_percent(p.unwrap_or(0.0))))
                    .collect(),
                metrics: multiclass.metrics,
            },
        })
    }
}

/// Fraction in `[0, 1]` → percentage with two decimals.
pub fn round_percent(p: f64) -> f64 {
    (p * 10_000.0).round() / 100.0
}

fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Dataset upload acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfirmation {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchResponse {
    query_timestamp: String,
    elapsed_ms: f64,
    neighbours: Vec<Map<String, Value>>,
}

/// Nearest-timestamp search result with typed neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query_timestamp: String,
    pub elapsed_ms: f64,
    pub neighbours: Vec<NeighborRecord>,
}

impl RawSearchResponse {
    pub(crate) fn into_result(self) -> Result<SearchResult, ClientError> {
        let neighbours = self
            .neighbours
            .iter()
            .map(neighbor_from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchResult {
            query_timestamp: self.query_timestamp,
            elapsed_ms: self.elapsed_ms,
            neighbours,
        })
    }
}

/// Strip a unit annotation: `power_consumption__Watts` and
/// `power_consumption (Watts)` both become `power_consumption`.
pub fn plain_field_name(raw: &str) -> &str {
    let cut = [raw.find("__"), raw.find(" (")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(raw.len());
    raw[..cut].trim()
}

/// Translate one raw neighbour row into a [`NeighborRecord`].
pub fn neighbor_from_raw(raw: &Map<String, Value>) -> Result<NeighborRecord, ClientError> {
    let plain: BTreeMap<&str, &Value> = raw
        .iter()
        .map(|(k, v)| (plain_field_name(k), v))
        .collect();

    let number = |name: &str| -> Result<f64, ClientError> {
        match plain.get(name) {
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| ClientError::Decode(format!("field '{name}' is not a float"))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| ClientError::Decode(format!("field '{name}' is not numeric: {s}"))),
            _ => Err(ClientError::Decode(format!(
                "neighbour is missing numeric field '{name}'"
            ))),
        }
    };
    let text = |name: &str| -> Result<String, ClientError> {
        match plain.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(ClientError::Decode(format!(
                "neighbour is missing field '{name}'"
            ))),
            Some(other) => Ok(other.to_string()),
        }
    };

    Ok(NeighborRecord {
        bulb_number: number("bulb_number")? as i64,
        timestamp: text("timestamp")?,
        power_consumption: number("power_consumption")?,
        voltage_levels: number("voltage_levels")?,
        current_fluctuations: number("current_fluctuations")?,
        temperature: number("temperature")?,
        current_fluctuations_env: number("current_fluctuations_env")?,
        environmental_conditions: text("environmental_conditions")?,
        distance: number("distance").ok(),
    })
}

/// `POST /search/search/add` body: a reading in the backend's field names.
#[derive(Debug, Serialize)]
pub(crate) struct BulbEntryBody<'a> {
    bulb_number: i64,
    timestamp: &'a str,
    #[serde(rename = "power_consumption__Watts")]
    power_consumption: f64,
    #[serde(rename = "voltage_levels__Volts")]
    voltage_levels: f64,
    #[serde(rename = "current_fluctuations__Amperes")]
    current_fluctuations: f64,
    #[serde(rename = "temperature__Celsius")]
    temperature: f64,
    #[serde(rename = "current_fluctuations_env__Amperes")]
    current_fluctuations_env: f64,
    environmental_conditions: &'a str,
}

impl<'a> From<&'a NeighborRecord> for BulbEntryBody<'a> {
    fn from(record: &'a NeighborRecord) -> Self {
        Self {
            bulb_number: record.bulb_number,
            timestamp: &record.timestamp,
            power_consumption: record.power_consumption,
            voltage_levels: record.voltage_levels,
            current_fluctuations: record.current_fluctuations,
            temperature: record.temperature,
            current_fluctuations_env: record.current_fluctuations_env,
            environmental_conditions: &record.environmental_conditions,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::history::FieldValue;

    #[test]
    fn energy_average_and_display() {
        let prediction: EnergyPrediction = serde_json::from_value(json!({
            "timestamp": "2025-06-06 14:30",
            "predictions": {"random_forest": 27, "xgboost": 27, "lightgbm": 28,
                            "gradient_boosting": 28, "lstm": 36}
        }))
        .unwrap();
        assert_eq!(prediction.average(), Some(29.2));
        assert_eq!(prediction.average_display(), "29.20");
    }

    #[test]
    fn energy_average_of_nothing() {
        let prediction = EnergyPrediction {
            timestamp: String::new(),
            predictions: BTreeMap::new(),
        };
        assert_eq!(prediction.average(), None);
        assert_eq!(prediction.average_display(), "0");
    }

    #[test]
    fn fault_body_uses_backend_names_and_raw_values() {
        let mut inputs = Fields::new();
        inputs.insert("bulbNumber".into(), FieldValue::from("101"));
        inputs.insert("powerConsumption".into(), FieldValue::Number(120.0));
        inputs.insert("environmentalConditions".into(), FieldValue::from("Rainy"));
        inputs.insert("unrelated".into(), FieldValue::from("x"));

        let body = fault_request_body(&inputs);
        assert_eq!(
            body,
            json!({
                "bulb_number": "101",
                "power_consumption__Watts": 120.0,
                "environmental_conditions": "Rainy"
            })
        );
    }

    #[test]
    fn fault_summary_rounds_probabilities_to_percent() {
        let raw: RawFaultResponse = serde_json::from_value(json!({
            "binary": {
                "random_forest": {"prediction": "Fault", "probability": 0.87654, "metrics": {"f1": 0.9}},
                "svm": {"prediction": "No Fault", "probability": 0.1, "metrics": {}}
            },
            "multiclass": {
                "random_forest": {
                    "prediction": "Overheating",
                    "probabilities": {"Overheating": 0.61234, "Short": 0.38766, "Open": null},
                    "metrics": {}
                }
            }
        }))
        .unwrap();

        let summary = raw.into_summary().unwrap();
        assert!(summary.is_fault());
        assert_eq!(summary.binary.probability, 87.65);
        assert_eq!(summary.no_fault_percent(), 12.35);
        assert_eq!(summary.multiclass.prediction, "Overheating");
        assert_eq!(summary.multiclass.probabilities["Overheating"], 61.23);
        assert_eq!(summary.multiclass.probabilities["Short"], 38.77);
        assert_eq!(summary.multiclass.probabilities["Open"], 0.0);
        assert_eq!(summary.binary.metrics, json!({"f1": 0.9}));
    }

    #[test]
    fn fault_summary_requires_primary_model() {
        let raw: RawFaultResponse = serde_json::from_value(json!({
            "binary": {"svm": {"prediction": "Fault", "probability": 0.5}},
            "multiclass": {}
        }))
        .unwrap();
        assert!(matches!(raw.into_summary(), Err(ClientError::Decode(_))));
    }

    #[test]
    fn non_string_prediction_labels_are_rendered() {
        let raw: RawFaultResponse = serde_json::from_value(json!({
            "binary": {"random_forest": {"prediction": 1, "probability": null}},
            "multiclass": {"random_forest": {"prediction": "None", "probabilities": null}}
        }))
        .unwrap();
        let summary = raw.into_summary().unwrap();
        assert_eq!(summary.binary.prediction, "1");
        assert_eq!(summary.binary.probability, 0.0);
        assert!(summary.multiclass.probabilities.is_empty());
        assert!(!summary.is_fault());
    }

    #[test]
    fn plain_field_name_strips_unit_annotations() {
        assert_eq!(plain_field_name("power_consumption__Watts"), "power_consumption");
        assert_eq!(plain_field_name("voltage_levels (Volts)"), "voltage_levels");
        assert_eq!(
            plain_field_name("current_fluctuations_env__Amperes"),
            "current_fluctuations_env"
        );
        assert_eq!(plain_field_name("environmental_conditions"), "environmental_conditions");
    }

    #[test]
    fn neighbor_rows_are_renamed_into_typed_records() {
        let raw: RawSearchResponse = serde_json::from_value(json!({
            "query_timestamp": "2023-10-27 14:30:00",
            "elapsed_ms": 0.412,
            "neighbours": [{
                "bulb_number": 101,
                "timestamp": "2023-10-27 14:31:05",
                "power_consumption (Watts)": 150.2,
                "voltage_levels__Volts": 220.1,
                "current_fluctuations__Amperes": 0.68,
                "temperature (Celsius)": "45.5",
                "current_fluctuations_env__Amperes": 0.1,
                "environmental_conditions": "Clear",
                "distance": 0.0012
            }]
        }))
        .unwrap();

        let result = raw.into_result().unwrap();
        assert_eq!(result.neighbours.len(), 1);
        let n = &result.neighbours[0];
        assert_eq!(n.bulb_number, 101);
        assert_eq!(n.power_consumption, 150.2);
        assert_eq!(n.voltage_levels, 220.1);
        assert_eq!(n.temperature, 45.5);
        assert_eq!(n.environmental_conditions, "Clear");
        assert_eq!(n.distance, Some(0.0012));
    }

    #[test]
    fn neighbor_missing_measurement_is_a_decode_error() {
        let row = json!({"bulb_number": 1, "timestamp": "t", "environmental_conditions": "Clear"});
        let err = neighbor_from_raw(row.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("power_consumption"));
    }

    #[test]
    fn bulb_entry_body_uses_annotated_names() {
        let record = NeighborRecord {
            bulb_number: 7,
            timestamp: "2023-10-27 14:31:05".to_string(),
            power_consumption: 150.0,
            voltage_levels: 220.0,
            current_fluctuations: 0.5,
            temperature: 40.0,
            current_fluctuations_env: 0.1,
            environmental_conditions: "Clear".to_string(),
            distance: None,
        };
        let json = serde_json::to_value(BulbEntryBody::from(&record)).unwrap();
        assert_eq!(json["power_consumption__Watts"], json!(150.0));
        assert_eq!(json["temperature__Celsius"], json!(40.0));
        assert!(json.get("distance").is_none());
    }
}
