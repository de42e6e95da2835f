//! Prompt templates for the three insight kinds.
//!
//! Each builder turns a prediction result (and, for energy, the weather
//! inputs that produced it) into one plain-text prompt.

use std::fmt;
use std::str::FromStr;

use crate::client::{EnergyPrediction, SearchResult};
use crate::history::Fields;

// ---------------------------------------------------------------------------
// Insight kinds
// ---------------------------------------------------------------------------

/// Which narrative a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    /// Grid-operator action plan for an energy forecast.
    Energy,
    /// Field-technician diagnostic steps for a predicted fault.
    Fault,
    /// Analysis of a nearest-timestamp cluster.
    Cluster,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Energy => write!(f, "energy"),
            Self::Fault => write!(f, "fault"),
            Self::Cluster => write!(f, "cluster"),
        }
    }
}

impl FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "energy" => Ok(Self::Energy),
            "fault" | "faults" => Ok(Self::Fault),
            "cluster" | "search" => Ok(Self::Cluster),
            other => Err(format!(
                "unknown insight kind '{other}' (expected energy, fault or cluster)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Action plan for an energy forecast.
///
/// `inputs` are the form values the forecast was made from; the weather
/// fields `Temp`, `RH`, `FF` and `P` are quoted back verbatim.
pub fn energy_insights(prediction: &EnergyPrediction, inputs: &Fields) -> String {
    let weather = |name: &str| {
        inputs
            .get(name)
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    let models = prediction
        .predictions
        .iter()
        .map(|(model, value)| format!("{model}: {value}W"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "As a smart grid operator, I've received an energy demand forecast for the timestamp {timestamp}.\n\
         The forecast is based on these weather conditions: Temperature: {temp}°C, Humidity: {rh}%, \
         Wind Speed: {ff} km/h, Pressure: {p} hPa.\n\
         Multiple ML models provided predictions: {models}.\n\
         The average predicted demand is approximately {avg}W.\n\
         Provide a concise, actionable plan based on this average prediction. Include 3 bullet points \
         covering: 1. Proactive measures to ensure grid stability. 2. Potential for demand-response \
         program activation. 3. Recommendations for scheduling maintenance or non-critical tasks.",
        timestamp = prediction.timestamp,
        temp = weather("Temp"),
        rh = weather("RH"),
        ff = weather("FF"),
        p = weather("P"),
        avg = prediction.average_display(),
    )
}

/// Step-by-step diagnostic plan for a predicted fault type.
pub fn fault_steps(fault_type: &str) -> String {
    format!(
        "A smart grid sensor has predicted a fault. The fault type is: \"{fault_type}\". \
         As a senior maintenance engineer, provide a clear, step-by-step diagnostic plan for a \
         field technician. Use a numbered list. Include steps for safety precautions, verification \
         of the fault, and initial remediation actions."
    )
}

/// Analysis of the neighbours returned for a timestamp query.
pub fn cluster_analysis(result: &SearchResult) -> String {
    let rows = result
        .neighbours
        .iter()
        .map(|r| {
            format!(
                "Timestamp: {}, Bulb: {}, Condition: {}",
                r.timestamp, r.bulb_number, r.environmental_conditions
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "I have performed a nearest-neighbor search on a time-series dataset from a smart grid. \
         My query timestamp was {}. The top {} closest results are: {rows}. As a data analyst, \
         what could this clustering of timestamps signify? Provide a brief analysis. Consider \
         possibilities like a single event affecting multiple bulbs, a recurring pattern, or a \
         data anomaly. Keep it concise.",
        result.query_timestamp,
        result.neighbours.len(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
