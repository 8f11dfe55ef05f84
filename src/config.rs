//! Runtime configuration
//!
//! `SynthConfig` bundles the type catalog with generator settings and can be
//! loaded from JSON. Sections left out of the JSON fall back to defaults.

use crate::catalog::{ImportableType, TypeCatalog};
use crate::error::SynthError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default trailing window in days
pub const DEFAULT_WINDOW_DAYS: u32 = 90;

/// Inclusive range quantity values are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
}

impl Default for ValueRange {
    fn default() -> Self {
        Self {
            low: 1.0,
            high: 100.0,
        }
    }
}

impl ValueRange {
    pub fn contains(&self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }
}

/// Settings for the sample generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of trailing days to generate, one sample per day
    pub window_days: u32,
    pub quantity_range: ValueRange,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            quantity_range: ValueRange::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.window_days == 0 {
            return Err(SynthError::InvalidWindow(0));
        }
        let range = self.quantity_range;
        // rand's uniform sampler also needs the width itself to be finite
        if !range.low.is_finite()
            || !range.high.is_finite()
            || range.low > range.high
            || !(range.high - range.low).is_finite()
        {
            return Err(SynthError::InvalidConfig(format!(
                "quantity range [{}, {}] is not a finite ascending range",
                range.low, range.high
            )));
        }
        Ok(())
    }
}

/// Complete configuration surface for surveying and generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default = "default_types")]
    pub types: Vec<ImportableType>,
}

fn default_types() -> Vec<ImportableType> {
    TypeCatalog::apple_health().to_types()
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            types: default_types(),
        }
    }
}

impl SynthConfig {
    pub fn from_json(json: &str) -> Result<Self, SynthError> {
        let config: SynthConfig = serde_json::from_str(json)?;
        config.generator.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, SynthError> {
        let json = fs::read_to_string(path).map_err(|e| {
            SynthError::InputError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Build the validated type catalog
    pub fn catalog(&self) -> Result<TypeCatalog, SynthError> {
        TypeCatalog::new(self.types.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::STEP_COUNT;
    use std::io::Write;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = SynthConfig::from_json("{}").unwrap();

        assert_eq!(config.generator.window_days, DEFAULT_WINDOW_DAYS);
        assert_eq!(config.generator.quantity_range, ValueRange::default());
        assert_eq!(config.catalog().unwrap(), TypeCatalog::apple_health());
    }

    #[test]
    fn test_partial_generator_section() {
        let config = SynthConfig::from_json(r#"{ "generator": { "window_days": 7 } }"#).unwrap();

        assert_eq!(config.generator.window_days, 7);
        assert_eq!(config.generator.quantity_range.high, 100.0);
    }

    #[test]
    fn test_custom_catalog() {
        let json = r#"{
            "types": [{
                "identifier": "HKQuantityTypeIdentifierStepCount",
                "label": "Steps",
                "kind": { "policy": "quantity", "unit": "count" }
            }]
        }"#;
        let catalog = SynthConfig::from_json(json).unwrap().catalog().unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(STEP_COUNT));
    }

    #[test]
    fn test_rejects_zero_window() {
        let result = SynthConfig::from_json(r#"{ "generator": { "window_days": 0 } }"#);
        assert!(matches!(result, Err(SynthError::InvalidWindow(0))));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let json = r#"{ "generator": { "quantity_range": { "low": 10.0, "high": 1.0 } } }"#;
        assert!(matches!(
            SynthConfig::from_json(json),
            Err(SynthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_range_wider_than_f64() {
        let json = r#"{ "generator": { "quantity_range": { "low": -1.7e308, "high": 1.7e308 } } }"#;
        assert!(matches!(
            SynthConfig::from_json(json),
            Err(SynthError::InvalidConfig(_))
        ));

        let widest_finite = GeneratorConfig {
            quantity_range: ValueRange {
                low: -8.0e307,
                high: 8.0e307,
            },
            ..GeneratorConfig::default()
        };
        assert!(widest_finite.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "generator": {{ "window_days": 30 }} }}"#).unwrap();

        let config = SynthConfig::load(file.path()).unwrap();
        assert_eq!(config.generator.window_days, 30);
    }

    #[test]
    fn test_load_missing_file_is_input_error() {
        let result = SynthConfig::load(Path::new("/nonexistent/synth-config.json"));
        assert!(matches!(result, Err(SynthError::InputError(_))));
    }
}
