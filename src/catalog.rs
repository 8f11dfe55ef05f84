//! Importable type catalog
//!
//! The catalog is the allow-list of record types that may be written back to a
//! health store, together with the unit or categorical domain of each type.
//! It is supplied to the surveyor and the generator at construction time so
//! alternate catalogs can be used on platforms with different type sets.

use crate::error::SynthError;
use crate::types::{CategoryCode, RecordTypeName, Unit};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default span of a category sample in minutes (8 hours)
pub const DEFAULT_CATEGORY_SPAN_MINUTES: u32 = 8 * 60;

pub const STEP_COUNT: &str = "HKQuantityTypeIdentifierStepCount";
pub const DISTANCE_WALKING_RUNNING: &str = "HKQuantityTypeIdentifierDistanceWalkingRunning";
pub const FLIGHTS_CLIMBED: &str = "HKQuantityTypeIdentifierFlightsClimbed";
pub const ACTIVE_ENERGY_BURNED: &str = "HKQuantityTypeIdentifierActiveEnergyBurned";
pub const BASAL_ENERGY_BURNED: &str = "HKQuantityTypeIdentifierBasalEnergyBurned";
pub const DIETARY_CAFFEINE: &str = "HKQuantityTypeIdentifierDietaryCaffeine";
pub const APPLE_EXERCISE_TIME: &str = "HKQuantityTypeIdentifierAppleExerciseTime";
pub const SLEEP_ANALYSIS: &str = "HKCategoryTypeIdentifierSleepAnalysis";

fn default_span_minutes() -> u32 {
    DEFAULT_CATEGORY_SPAN_MINUTES
}

/// Generation policy of an importable type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TypeKind {
    /// Numeric samples recorded as instants
    Quantity { unit: Unit },
    /// Categorical samples spanning a fixed duration
    Category {
        codes: Vec<CategoryCode>,
        #[serde(default = "default_span_minutes")]
        span_minutes: u32,
    },
}

impl TypeKind {
    /// Fixed duration of category samples; `None` for quantities
    pub fn span(&self) -> Option<Duration> {
        match self {
            TypeKind::Quantity { .. } => None,
            TypeKind::Category { span_minutes, .. } => {
                Some(Duration::minutes(*span_minutes as i64))
            }
        }
    }
}

/// A record type the system is willing to write back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportableType {
    pub identifier: RecordTypeName,
    /// Human-readable label for pickers and reports
    pub label: String,
    pub kind: TypeKind,
}

impl ImportableType {
    pub fn quantity(identifier: &str, label: &str, unit: Unit) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.to_string(),
            kind: TypeKind::Quantity { unit },
        }
    }

    pub fn category(
        identifier: &str,
        label: &str,
        codes: Vec<CategoryCode>,
        span_minutes: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.to_string(),
            kind: TypeKind::Category { codes, span_minutes },
        }
    }

    fn validate(&self) -> Result<(), SynthError> {
        if self.identifier.as_str().is_empty() {
            return Err(SynthError::InvalidConfig(
                "type identifier must not be empty".to_string(),
            ));
        }
        if let TypeKind::Category { codes, span_minutes } = &self.kind {
            if codes.is_empty() {
                return Err(SynthError::InvalidConfig(format!(
                    "category type {} has no category codes",
                    self.identifier
                )));
            }
            if *span_minutes == 0 {
                return Err(SynthError::InvalidConfig(format!(
                    "category type {} must span at least one minute",
                    self.identifier
                )));
            }
        }
        Ok(())
    }
}

/// Allow-list of importable types keyed by identifier
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCatalog {
    types: BTreeMap<RecordTypeName, ImportableType>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::apple_health()
    }
}

impl TypeCatalog {
    /// Build a catalog, rejecting empty lists, duplicates and malformed entries
    pub fn new(types: Vec<ImportableType>) -> Result<Self, SynthError> {
        if types.is_empty() {
            return Err(SynthError::InvalidConfig(
                "catalog must contain at least one type".to_string(),
            ));
        }

        let mut map = BTreeMap::new();
        for importable in types {
            importable.validate()?;
            let id = importable.identifier.clone();
            if map.insert(id.clone(), importable).is_some() {
                return Err(SynthError::InvalidConfig(format!(
                    "duplicate type identifier: {}",
                    id
                )));
            }
        }

        Ok(Self { types: map })
    }

    /// Catalog of Apple Health types that can be written back
    pub fn apple_health() -> Self {
        let types = apple_health_types()
            .into_iter()
            .map(|t| (t.identifier.clone(), t))
            .collect();
        Self { types }
    }

    pub fn get(&self, identifier: &str) -> Option<&ImportableType> {
        self.types.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.types.contains_key(identifier)
    }

    pub fn label(&self, identifier: &str) -> Option<&str> {
        self.get(identifier).map(|t| t.label.as_str())
    }

    /// Types in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &ImportableType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn to_types(&self) -> Vec<ImportableType> {
        self.types.values().cloned().collect()
    }
}

/// Sleep phases accepted by the health store
pub fn sleep_analysis_codes() -> Vec<CategoryCode> {
    vec![
        CategoryCode::new(0, "HKCategoryValueSleepAnalysisInBed"),
        CategoryCode::new(2, "HKCategoryValueSleepAnalysisAwake"),
        CategoryCode::new(3, "HKCategoryValueSleepAnalysisAsleepCore"),
        CategoryCode::new(4, "HKCategoryValueSleepAnalysisAsleepDeep"),
        CategoryCode::new(5, "HKCategoryValueSleepAnalysisAsleepREM"),
    ]
}

fn apple_health_types() -> Vec<ImportableType> {
    vec![
        ImportableType::quantity(STEP_COUNT, "Steps", Unit::Count),
        ImportableType::quantity(
            DISTANCE_WALKING_RUNNING,
            "Walking + Running Distance",
            Unit::Meter,
        ),
        ImportableType::quantity(FLIGHTS_CLIMBED, "Flights Climbed", Unit::Count),
        ImportableType::quantity(ACTIVE_ENERGY_BURNED, "Active Energy", Unit::Kilocalorie),
        ImportableType::quantity(BASAL_ENERGY_BURNED, "Resting Energy", Unit::Kilocalorie),
        ImportableType::quantity(DIETARY_CAFFEINE, "Caffeine", Unit::Milligram),
        ImportableType::quantity(APPLE_EXERCISE_TIME, "Exercise Minutes", Unit::Minute),
        ImportableType::category(
            SLEEP_ANALYSIS,
            "Sleep",
            sleep_analysis_codes(),
            DEFAULT_CATEGORY_SPAN_MINUTES,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apple_catalog_lookup() {
        let catalog = TypeCatalog::apple_health();

        assert_eq!(catalog.len(), 8);
        assert!(catalog.contains(STEP_COUNT));
        assert!(!catalog.contains("HKQuantityTypeIdentifierUnknownThing"));
        assert_eq!(catalog.label(DIETARY_CAFFEINE), Some("Caffeine"));
        assert_eq!(
            catalog.get(DISTANCE_WALKING_RUNNING).map(|t| &t.kind),
            Some(&TypeKind::Quantity { unit: Unit::Meter })
        );
        assert_eq!(
            catalog.get(SLEEP_ANALYSIS).and_then(|t| t.kind.span()),
            Some(Duration::hours(8))
        );
    }

    #[test]
    fn test_sleep_is_category_with_eight_hour_span() {
        let catalog = TypeCatalog::apple_health();
        let sleep = catalog.get(SLEEP_ANALYSIS).unwrap();

        assert_eq!(sleep.kind.span(), Some(Duration::hours(8)));
        match &sleep.kind {
            TypeKind::Category { codes, .. } => assert_eq!(codes.len(), 5),
            TypeKind::Quantity { .. } => panic!("Expected category policy"),
        }
    }

    #[test]
    fn test_iter_is_identifier_ordered() {
        let catalog = TypeCatalog::apple_health();
        let ids: Vec<&str> = catalog.iter().map(|t| t.identifier.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();

        assert_eq!(ids, sorted);
        assert_eq!(ids[0], SLEEP_ANALYSIS);
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = TypeCatalog::new(vec![
            ImportableType::quantity(STEP_COUNT, "Steps", Unit::Count),
            ImportableType::quantity(STEP_COUNT, "Steps again", Unit::Count),
        ]);

        assert!(matches!(result, Err(SynthError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_rejects_empty_category_domain() {
        let result = TypeCatalog::new(vec![ImportableType::category(
            SLEEP_ANALYSIS,
            "Sleep",
            Vec::new(),
            60,
        )]);

        assert!(matches!(result, Err(SynthError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_rejects_empty_catalog() {
        assert!(matches!(
            TypeCatalog::new(Vec::new()),
            Err(SynthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_importable_type_json_shape() {
        let json = r#"{
            "identifier": "HKCategoryTypeIdentifierMindfulSession",
            "label": "Mindfulness",
            "kind": {
                "policy": "category",
                "codes": [{ "value": 0, "identifier": "HKCategoryValueNotApplicable" }]
            }
        }"#;

        let parsed: ImportableType = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.kind,
            TypeKind::Category {
                codes: vec![CategoryCode::new(0, "HKCategoryValueNotApplicable")],
                span_minutes: DEFAULT_CATEGORY_SPAN_MINUTES,
            }
        );
    }
}
