//! Synheart Synth - Health export surveying and synthetic sample generation
//!
//! Synth scans an Apple Health XML export for the record types it contains and
//! produces synthetic daily samples for one importable type, ready to be
//! written into a health store for testing: export → survey → type selection
//! → generation → sink.
//!
//! ## Modules
//!
//! - **Survey**: Stream an export and list its importable record types
//! - **Generator**: Produce a trailing window of synthetic samples for one type
//! - **Sink**: Hand generated batches to a persistence backend

pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod sink;
pub mod survey;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use catalog::{ImportableType, TypeCatalog, TypeKind};
pub use config::{GeneratorConfig, SynthConfig};
pub use error::SynthError;
pub use generator::SampleGenerator;
pub use pipeline::{generate_samples, survey_export, ExportSource, ImportSession, ImportState};
pub use sink::{JsonSink, MemorySink, OutputFormat, SampleSink, SinkAck, SinkError};
pub use survey::{RecordTypeSurveyor, SurveyReport};
pub use types::{CategoryCode, RecordTypeName, SampleBatch, SampleValue, SyntheticSample, Unit};

/// Synth version
pub const SYNTH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by tooling
pub const PRODUCER_NAME: &str = "synheart-synth";
