//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Synth: stateless helpers
//! for one-shot surveying and generation, and `ImportSession`, which drives a
//! single import run from file selection through submission to a sink.

use crate::catalog::TypeCatalog;
use crate::config::{GeneratorConfig, SynthConfig};
use crate::error::SynthError;
use crate::generator::SampleGenerator;
use crate::sink::{SampleSink, SinkAck};
use crate::survey::{RecordTypeSurveyor, SurveyReport};
use crate::types::{RecordTypeName, SampleBatch};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Survey an in-memory export against the built-in catalog.
///
/// # Returns
/// Sorted, deduplicated importable type names found in the export
pub fn survey_export(xml: &[u8]) -> Result<Vec<RecordTypeName>, SynthError> {
    RecordTypeSurveyor::default().survey_bytes(xml)
}

/// Generate a batch for one built-in type with an entropy-seeded source.
///
/// # Example
/// ```ignore
/// let batch = generate_samples("HKQuantityTypeIdentifierStepCount", 90, Utc::now())?;
/// ```
pub fn generate_samples(
    record_type: &str,
    window_days: u32,
    anchor: DateTime<Utc>,
) -> Result<SampleBatch, SynthError> {
    let mut generator = SampleGenerator::new(TypeCatalog::default(), GeneratorConfig::default())?;
    generator.generate(record_type, window_days, anchor)
}

/// Where the export to survey comes from
#[derive(Debug, Clone)]
pub enum ExportSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Lifecycle of one import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    FileSelected,
    Surveyed,
    TypeSelected,
    Generated,
    SubmittedToSink,
    Succeeded,
    Failed,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportState::Idle => "idle",
            ImportState::FileSelected => "file_selected",
            ImportState::Surveyed => "surveyed",
            ImportState::TypeSelected => "type_selected",
            ImportState::Generated => "generated",
            ImportState::SubmittedToSink => "submitted_to_sink",
            ImportState::Succeeded => "succeeded",
            ImportState::Failed => "failed",
        }
    }
}

/// Stateful driver for a single import run.
///
/// Calls made out of order fail with `InvalidTransition` and leave the
/// session untouched. Selecting a new file is always allowed and discards
/// everything derived from the previous one.
pub struct ImportSession<R = StdRng> {
    surveyor: RecordTypeSurveyor,
    generator: SampleGenerator<R>,
    state: ImportState,
    source: Option<ExportSource>,
    report: Option<SurveyReport>,
    selected: Option<RecordTypeName>,
    batch: Option<SampleBatch>,
    last_ack: Option<SinkAck>,
}

impl ImportSession<StdRng> {
    /// Create a session from configuration with an entropy-seeded source
    pub fn new(config: &SynthConfig) -> Result<Self, SynthError> {
        let catalog = config.catalog()?;
        let generator = SampleGenerator::new(catalog.clone(), config.generator.clone())?;
        Ok(Self::from_parts(RecordTypeSurveyor::new(catalog), generator))
    }

    /// Create a session whose generated samples are reproducible
    pub fn with_seed(config: &SynthConfig, seed: u64) -> Result<Self, SynthError> {
        let catalog = config.catalog()?;
        let generator =
            SampleGenerator::with_seed(catalog.clone(), config.generator.clone(), seed)?;
        Ok(Self::from_parts(RecordTypeSurveyor::new(catalog), generator))
    }
}

impl<R: Rng> ImportSession<R> {
    pub fn from_parts(surveyor: RecordTypeSurveyor, generator: SampleGenerator<R>) -> Self {
        Self {
            surveyor,
            generator,
            state: ImportState::Idle,
            source: None,
            report: None,
            selected: None,
            batch: None,
            last_ack: None,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn catalog(&self) -> &TypeCatalog {
        self.surveyor.catalog()
    }

    /// Importable types found by the last successful survey
    pub fn available(&self) -> &[RecordTypeName] {
        self.report
            .as_ref()
            .map(|r| r.importable.as_slice())
            .unwrap_or(&[])
    }

    pub fn survey_report(&self) -> Option<&SurveyReport> {
        self.report.as_ref()
    }

    pub fn selected(&self) -> Option<&RecordTypeName> {
        self.selected.as_ref()
    }

    pub fn batch(&self) -> Option<&SampleBatch> {
        self.batch.as_ref()
    }

    pub fn last_ack(&self) -> Option<&SinkAck> {
        self.last_ack.as_ref()
    }

    /// Return to `Idle`, dropping all run state
    pub fn reset(&mut self) {
        self.source = None;
        self.report = None;
        self.selected = None;
        self.batch = None;
        self.last_ack = None;
        self.transition(ImportState::Idle);
    }

    /// Select the export to import from
    pub fn select_file(&mut self, source: ExportSource) {
        self.reset();
        self.source = Some(source);
        self.transition(ImportState::FileSelected);
    }

    /// Survey the selected export.
    ///
    /// A parse or input failure moves the session to `Failed` with no
    /// available types.
    pub fn survey(&mut self) -> Result<&[RecordTypeName], SynthError> {
        self.expect_state(&[ImportState::FileSelected], "survey")?;

        let result = match &self.source {
            Some(ExportSource::Bytes(bytes)) => self.surveyor.report_bytes(bytes),
            Some(ExportSource::File(path)) => self.surveyor.report_file(path),
            None => Err(SynthError::InputError("no export selected".to_string())),
        };

        match result {
            Ok(report) => {
                self.report = Some(report);
                self.transition(ImportState::Surveyed);
                Ok(self.available())
            }
            Err(e) => {
                warn!(error = %e, "survey failed");
                self.report = None;
                self.transition(ImportState::Failed);
                Err(e)
            }
        }
    }

    /// Pick one of the surveyed types for generation
    pub fn select_type(&mut self, record_type: &str) -> Result<(), SynthError> {
        self.expect_state(
            &[
                ImportState::Surveyed,
                ImportState::TypeSelected,
                ImportState::Generated,
            ],
            "select a type",
        )?;

        let name = self
            .available()
            .iter()
            .find(|name| name.as_str() == record_type)
            .cloned()
            .ok_or_else(|| SynthError::UnsupportedType(record_type.to_string()))?;

        self.selected = Some(name);
        self.batch = None;
        self.transition(ImportState::TypeSelected);
        Ok(())
    }

    /// Generate the batch for the selected type over the configured window
    pub fn generate(&mut self, anchor: DateTime<Utc>) -> Result<&SampleBatch, SynthError> {
        self.expect_state(
            &[ImportState::TypeSelected, ImportState::Generated],
            "generate samples",
        )?;

        let Some(selected) = self.selected.clone() else {
            return Err(SynthError::InvalidTransition {
                state: self.state.as_str(),
                action: "generate samples",
            });
        };

        match self.generator.generate_default(selected.as_str(), anchor) {
            Ok(batch) => {
                self.transition(ImportState::Generated);
                let batch = self.batch.insert(batch);
                Ok(&*batch)
            }
            Err(e) => {
                warn!(error = %e, record_type = %selected, "generation failed");
                self.batch = None;
                self.transition(ImportState::Failed);
                Err(e)
            }
        }
    }

    /// Hand the generated batch to `sink`
    pub fn submit<S: SampleSink + ?Sized>(&mut self, sink: &mut S) -> Result<SinkAck, SynthError> {
        self.expect_state(&[ImportState::Generated], "submit")?;

        let Some(batch) = self.batch.take() else {
            return Err(SynthError::InvalidTransition {
                state: self.state.as_str(),
                action: "submit",
            });
        };

        self.transition(ImportState::SubmittedToSink);
        match sink.submit(batch) {
            Ok(ack) => {
                self.last_ack = Some(ack.clone());
                self.transition(ImportState::Succeeded);
                Ok(ack)
            }
            Err(e) => {
                warn!(error = %e, "sink rejected batch");
                self.transition(ImportState::Failed);
                Err(SynthError::Sink(e))
            }
        }
    }

    fn expect_state(
        &self,
        allowed: &[ImportState],
        action: &'static str,
    ) -> Result<(), SynthError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SynthError::InvalidTransition {
                state: self.state.as_str(),
                action,
            })
        }
    }

    fn transition(&mut self, next: ImportState) {
        if self.state != next {
            info!(from = self.state.as_str(), to = next.as_str(), "import session transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SLEEP_ANALYSIS, STEP_COUNT};
    use crate::sink::{MemorySink, SinkError};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Record type="HKQuantityTypeIdentifierStepCount" unit="count" value="412"/>
 <Record type="HKQuantityTypeIdentifierUnknownThing" unit="count" value="1"/>
 <Record type="HKCategoryTypeIdentifierSleepAnalysis" value="HKCategoryValueSleepAnalysisInBed"/>
 <Record type="HKQuantityTypeIdentifierStepCount" unit="count" value="97"/>
</HealthData>
"#;

    fn anchor() -> DateTime<Utc> {
        "2024-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
    }

    fn session() -> ImportSession {
        ImportSession::with_seed(&SynthConfig::default(), 42).unwrap()
    }

    struct RejectingSink;

    impl SampleSink for RejectingSink {
        fn submit(&mut self, _batch: SampleBatch) -> Result<SinkAck, SinkError> {
            Err(SinkError::Rejected("authorization denied".to_string()))
        }
    }

    #[test]
    fn test_survey_export_helper() {
        let found = survey_export(EXPORT.as_bytes()).unwrap();
        assert_eq!(
            found,
            vec![
                RecordTypeName::from(SLEEP_ANALYSIS),
                RecordTypeName::from(STEP_COUNT),
            ]
        );
    }

    #[test]
    fn test_generate_samples_helper() {
        let batch = generate_samples(STEP_COUNT, 90, anchor()).unwrap();
        assert_eq!(batch.len(), 90);
        assert_eq!(batch.samples[89].start, anchor() - Duration::days(89));
    }

    #[test]
    fn test_full_run_succeeds() {
        let mut session = session();
        assert_eq!(session.state(), ImportState::Idle);

        session.select_file(ExportSource::Bytes(EXPORT.as_bytes().to_vec()));
        assert_eq!(session.state(), ImportState::FileSelected);

        let available = session.survey().unwrap().to_vec();
        assert_eq!(available.len(), 2);
        assert_eq!(session.survey_report().unwrap().unsupported.len(), 1);

        session.select_type(STEP_COUNT).unwrap();
        assert_eq!(session.state(), ImportState::TypeSelected);

        let generated = session.generate(anchor()).unwrap().len();
        assert_eq!(generated, 90);
        assert_eq!(session.state(), ImportState::Generated);

        let mut sink = MemorySink::new();
        let ack = session.submit(&mut sink).unwrap();
        assert_eq!(ack.accepted, 90);
        assert_eq!(session.state(), ImportState::Succeeded);
        assert!(session.batch().is_none());
        assert_eq!(session.last_ack(), Some(&ack));
        assert_eq!(sink.total_samples(), 90);
    }

    #[test]
    fn test_parse_failure_leaves_no_types() {
        let mut session = session();
        session.select_file(ExportSource::Bytes(b"<HealthData><Record type=".to_vec()));

        assert!(matches!(session.survey(), Err(SynthError::ParseError(_))));
        assert_eq!(session.state(), ImportState::Failed);
        assert!(session.available().is_empty());
    }

    #[test]
    fn test_type_must_be_surveyed() {
        let mut session = session();
        session.select_file(ExportSource::Bytes(EXPORT.as_bytes().to_vec()));
        session.survey().unwrap();

        let result = session.select_type("HKQuantityTypeIdentifierDietaryCaffeine");
        assert!(matches!(result, Err(SynthError::UnsupportedType(_))));
        assert_eq!(session.state(), ImportState::Surveyed);
    }

    #[test]
    fn test_out_of_order_calls_are_rejected() {
        let mut session = session();

        assert!(matches!(
            session.survey(),
            Err(SynthError::InvalidTransition { state: "idle", .. })
        ));
        assert!(matches!(
            session.generate(anchor()),
            Err(SynthError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.submit(&mut MemorySink::new()),
            Err(SynthError::InvalidTransition { .. })
        ));
        assert_eq!(session.state(), ImportState::Idle);
    }

    #[test]
    fn test_sink_failure_moves_to_failed() {
        let mut session = session();
        session.select_file(ExportSource::Bytes(EXPORT.as_bytes().to_vec()));
        session.survey().unwrap();
        session.select_type(SLEEP_ANALYSIS).unwrap();
        session.generate(anchor()).unwrap();

        let result = session.submit(&mut RejectingSink);
        assert!(matches!(result, Err(SynthError::Sink(SinkError::Rejected(_)))));
        assert_eq!(session.state(), ImportState::Failed);
        assert!(session.last_ack().is_none());
    }

    #[test]
    fn test_selecting_new_file_resets_run() {
        let mut session = session();
        session.select_file(ExportSource::Bytes(EXPORT.as_bytes().to_vec()));
        session.survey().unwrap();
        session.select_type(STEP_COUNT).unwrap();

        session.select_file(ExportSource::Bytes(EXPORT.as_bytes().to_vec()));
        assert_eq!(session.state(), ImportState::FileSelected);
        assert!(session.selected().is_none());
        assert!(session.available().is_empty());
    }

    #[test]
    fn test_missing_file_fails_survey() {
        let mut session = session();
        session.select_file(ExportSource::File(PathBuf::from("/nonexistent/export.xml")));

        assert!(matches!(session.survey(), Err(SynthError::InputError(_))));
        assert_eq!(session.state(), ImportState::Failed);
    }
}
