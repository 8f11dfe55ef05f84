//! Core types for Synheart Synth
//!
//! This module defines the data that flows between the surveyor, the sample
//! generator and a sink: record type names, units, category codes, synthetic
//! samples and the batch that groups one import run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Identifier of a health record type as it appears in an export
/// (e.g. `HKQuantityTypeIdentifierStepCount`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTypeName(String);

impl RecordTypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordTypeName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for RecordTypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for RecordTypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Measurement unit attached to quantity samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Count,
    Meter,
    Kilocalorie,
    Milligram,
    Minute,
    Hour,
}

impl Unit {
    /// Unit string as used in health exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::Meter => "m",
            Unit::Kilocalorie => "kcal",
            Unit::Milligram => "mg",
            Unit::Minute => "min",
            Unit::Hour => "hr",
        }
    }
}

/// One value of a categorical domain (e.g. a sleep phase)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCode {
    /// Raw integer code understood by the health store
    pub value: i64,
    /// Export identifier (e.g. `HKCategoryValueSleepAnalysisAsleepREM`)
    pub identifier: String,
}

impl CategoryCode {
    pub fn new(value: i64, identifier: impl Into<String>) -> Self {
        Self {
            value,
            identifier: identifier.into(),
        }
    }
}

/// Value carried by a synthetic sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleValue {
    Quantity { value: f64, unit: Unit },
    Category { code: CategoryCode },
}

impl SampleValue {
    pub fn as_quantity(&self) -> Option<f64> {
        match self {
            SampleValue::Quantity { value, .. } => Some(*value),
            SampleValue::Category { .. } => None,
        }
    }

    pub fn as_category(&self) -> Option<&CategoryCode> {
        match self {
            SampleValue::Category { code } => Some(code),
            SampleValue::Quantity { .. } => None,
        }
    }
}

/// One generated data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSample {
    #[serde(rename = "type")]
    pub record_type: RecordTypeName,
    pub value: SampleValue,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyntheticSample {
    /// Instant samples have `start == end`
    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }
}

/// All samples produced by one import run, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBatch {
    pub batch_id: Uuid,
    pub record_type: RecordTypeName,
    /// Reference "now" the window trails from
    pub anchor: DateTime<Utc>,
    pub window_days: u32,
    pub samples: Vec<SyntheticSample>,
}

impl SampleBatch {
    pub fn new(record_type: RecordTypeName, anchor: DateTime<Utc>, window_days: u32) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            record_type,
            anchor,
            window_days,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SyntheticSample> {
        self.samples.iter()
    }
}

impl IntoIterator for SampleBatch {
    type Item = SyntheticSample;
    type IntoIter = std::vec::IntoIter<SyntheticSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_name_orders_lexicographically() {
        let mut names = vec![
            RecordTypeName::from("HKQuantityTypeIdentifierStepCount"),
            RecordTypeName::from("HKCategoryTypeIdentifierSleepAnalysis"),
            RecordTypeName::from("HKQuantityTypeIdentifierDietaryCaffeine"),
        ];
        names.sort();

        assert_eq!(names[0].as_str(), "HKCategoryTypeIdentifierSleepAnalysis");
        assert_eq!(names[1].as_str(), "HKQuantityTypeIdentifierDietaryCaffeine");
        assert_eq!(names[2].as_str(), "HKQuantityTypeIdentifierStepCount");
    }

    #[test]
    fn test_sample_serializes_type_field() {
        let at = "2024-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let sample = SyntheticSample {
            record_type: "HKQuantityTypeIdentifierStepCount".into(),
            value: SampleValue::Quantity {
                value: 42.0,
                unit: Unit::Count,
            },
            start: at,
            end: at,
        };

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["type"], "HKQuantityTypeIdentifierStepCount");
        assert_eq!(json["value"]["kind"], "quantity");
        assert_eq!(json["value"]["unit"], "count");
        assert!(sample.is_instant());
    }

    #[test]
    fn test_sample_value_accessors() {
        let quantity = SampleValue::Quantity {
            value: 12.5,
            unit: Unit::Milligram,
        };
        let category = SampleValue::Category {
            code: CategoryCode::new(5, "HKCategoryValueSleepAnalysisAsleepREM"),
        };

        assert_eq!(quantity.as_quantity(), Some(12.5));
        assert!(quantity.as_category().is_none());
        assert_eq!(category.as_category().map(|c| c.value), Some(5));
        assert!(category.as_quantity().is_none());
    }

    #[test]
    fn test_new_batch_is_empty() {
        let anchor = Utc::now();
        let batch = SampleBatch::new("HKQuantityTypeIdentifierStepCount".into(), anchor, 90);

        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.window_days, 90);
        assert_eq!(batch.anchor, anchor);
    }
}
