//! Client-side filtering of nearest-timestamp search results.
//!
//! A [`FilterCriteria`] maps record fields to predicates: a case-insensitive
//! substring pattern or an inclusive numeric range with optional bounds.
//! [`apply`] keeps a record only when every predicate passes, preserving the
//! original order.
//!
//! Numeric comparisons follow IEEE semantics: a NaN bound (from a bound that
//! did not parse as a number) or a text value under a bounded range never
//! satisfies `>=`/`<=`, so the criterion fails instead of raising an error.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of a nearest-timestamp search result, with plain field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub bulb_number: i64,
    pub timestamp: String,
    pub power_consumption: f64,
    pub voltage_levels: f64,
    pub current_fluctuations: f64,
    pub temperature: f64,
    pub current_fluctuations_env: f64,
    pub environmental_conditions: String,
    /// Distance from the query timestamp in the search index's space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Fields of [`NeighborRecord`] that a criterion can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    BulbNumber,
    Timestamp,
    PowerConsumption,
    VoltageLevels,
    CurrentFluctuations,
    Temperature,
    CurrentFluctuationsEnv,
    EnvironmentalConditions,
}

/// A borrowed field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl RecordValue<'_> {
    /// Numeric view; text reads as NaN.
    fn numeric(self) -> f64 {
        match self {
            Self::Number(n) => n,
            Self::Text(_) => f64::NAN,
        }
    }
}

impl fmt::Display for RecordValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl NeighborRecord {
    pub fn value(&self, field: Field) -> RecordValue<'_> {
        match field {
            Field::BulbNumber => RecordValue::Number(self.bulb_number as f64),
            Field::Timestamp => RecordValue::Text(&self.timestamp),
            Field::PowerConsumption => RecordValue::Number(self.power_consumption),
            Field::VoltageLevels => RecordValue::Number(self.voltage_levels),
            Field::CurrentFluctuations => RecordValue::Number(self.current_fluctuations),
            Field::Temperature => RecordValue::Number(self.temperature),
            Field::CurrentFluctuationsEnv => RecordValue::Number(self.current_fluctuations_env),
            Field::EnvironmentalConditions => RecordValue::Text(&self.environmental_conditions),
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Inclusive range; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn contains(&self, x: f64) -> bool {
        x >= self.min.unwrap_or(f64::NEG_INFINITY) && x <= self.max.unwrap_or(f64::INFINITY)
    }
}

/// A single predicate on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Case-insensitive substring match on the value's display form.
    Contains(String),
    Range(NumericRange),
}

impl Criterion {
    /// Whether the criterion constrains anything at all.
    pub fn is_constraint(&self) -> bool {
        match self {
            Self::Contains(pattern) => !pattern.is_empty(),
            Self::Range(range) => !range.is_unbounded(),
        }
    }

    pub fn matches(&self, value: RecordValue<'_>) -> bool {
        if !self.is_constraint() {
            return true;
        }
        match self {
            Self::Contains(pattern) => value
                .to_string()
                .to_lowercase()
                .contains(&pattern.to_lowercase()),
            Self::Range(range) => range.contains(value.numeric()),
        }
    }
}

/// The full set of active predicates. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterCriteria(BTreeMap<Field, Criterion>);

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(mut self, field: Field, pattern: impl Into<String>) -> Self {
        self.0.insert(field, Criterion::Contains(pattern.into()));
        self
    }

    pub fn range(mut self, field: Field, min: Option<f64>, max: Option<f64>) -> Self {
        self.0
            .insert(field, Criterion::Range(NumericRange::new(min, max)));
        self
    }

    /// `true` when no criterion constrains anything.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|c| !c.is_constraint())
    }

    pub fn get(&self, field: Field) -> Option<&Criterion> {
        self.0.get(&field)
    }

    pub fn matches(&self, record: &NeighborRecord) -> bool {
        self.0
            .iter()
            .all(|(field, criterion)| criterion.matches(record.value(*field)))
    }
}

/// Keep the records that satisfy every criterion, in their original order.
pub fn apply(records: &[NeighborRecord], criteria: &FilterCriteria) -> Vec<NeighborRecord> {
    records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Flat filter form as edited on the dashboard. Every field is raw text;
/// an empty string means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterForm {
    pub bulb_number: String,
    pub env_cond: String,
    pub power_min: String,
    pub power_max: String,
    pub voltage_min: String,
    pub voltage_max: String,
    pub temp_min: String,
    pub temp_max: String,
}

impl FilterForm {
    pub fn to_criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new();
        if !self.bulb_number.is_empty() {
            criteria = criteria.contains(Field::BulbNumber, self.bulb_number.clone());
        }
        if !self.env_cond.is_empty() {
            criteria = criteria.contains(Field::EnvironmentalConditions, self.env_cond.clone());
        }
        let ranges = [
            (Field::PowerConsumption, &self.power_min, &self.power_max),
            (Field::VoltageLevels, &self.voltage_min, &self.voltage_max),
            (Field::Temperature, &self.temp_min, &self.temp_max),
        ];
        for (field, min, max) in ranges {
            let range = NumericRange::new(parse_bound(min), parse_bound(max));
            if !range.is_unbounded() {
                criteria = criteria.range(field, range.min, range.max);
            }
        }
        criteria
    }
}

/// Empty → unbounded; unparsable → NaN, which no value satisfies.
fn parse_bound(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.parse().unwrap_or(f64::NAN))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
