//! Record type surveyor

use super::events::element_starts;
use crate::catalog::TypeCatalog;
use crate::error::SynthError;
use crate::types::RecordTypeName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

/// Element carrying one health record
pub const RECORD_ELEMENT: &str = "Record";

/// Attribute holding the record type identifier
pub const TYPE_ATTRIBUTE: &str = "type";

const FILE_BUFFER_BYTES: usize = 64 * 1024;

/// Outcome of surveying one export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyReport {
    /// Distinct allow-listed types, sorted
    pub importable: Vec<RecordTypeName>,
    /// Distinct types present in the export but not allow-listed, sorted
    pub unsupported: Vec<RecordTypeName>,
    /// Number of `Record` elements seen
    pub record_count: usize,
}

/// Collects the distinct record types of an export and filters them
/// against the importable catalog.
#[derive(Debug, Clone)]
pub struct RecordTypeSurveyor {
    catalog: TypeCatalog,
}

impl Default for RecordTypeSurveyor {
    fn default() -> Self {
        Self::new(TypeCatalog::default())
    }
}

impl RecordTypeSurveyor {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Survey a stream and return the sorted importable types found in it.
    pub fn survey<R: BufRead>(&self, source: R) -> Result<Vec<RecordTypeName>, SynthError> {
        self.survey_report(source).map(|report| report.importable)
    }

    /// Survey an in-memory export.
    pub fn survey_bytes(&self, xml: &[u8]) -> Result<Vec<RecordTypeName>, SynthError> {
        self.report_bytes(xml).map(|report| report.importable)
    }

    /// Survey an in-memory export, keeping unsupported types and counts.
    pub fn report_bytes(&self, xml: &[u8]) -> Result<SurveyReport, SynthError> {
        self.survey_report(xml)
    }

    /// Survey an export file without loading it into memory.
    pub fn report_file(&self, path: &Path) -> Result<SurveyReport, SynthError> {
        let file = File::open(path).map_err(|e| {
            SynthError::InputError(format!("cannot open {}: {}", path.display(), e))
        })?;
        let metadata = file.metadata().map_err(|e| {
            SynthError::InputError(format!("cannot stat {}: {}", path.display(), e))
        })?;
        if metadata.len() == 0 {
            return Err(SynthError::InputError(format!(
                "health export {} is empty",
                path.display()
            )));
        }

        self.survey_report(BufReader::with_capacity(FILE_BUFFER_BYTES, file))
    }

    /// Full survey over a buffered stream.
    ///
    /// Either the whole document is scanned successfully or an error is
    /// returned; no partial list is ever produced.
    pub fn survey_report<R: BufRead>(&self, mut source: R) -> Result<SurveyReport, SynthError> {
        // Blank input is "no export", whether it arrives as bytes, a file or stdin
        loop {
            let head = source.fill_buf().map_err(|e| {
                SynthError::InputError(format!("cannot read health export: {}", e))
            })?;
            if head.is_empty() {
                return Err(SynthError::InputError("health export is empty".to_string()));
            }
            let blank = head.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let buffered = head.len();
            source.consume(blank);
            if blank < buffered {
                break;
            }
        }

        let mut discovered: BTreeSet<RecordTypeName> = BTreeSet::new();
        let mut record_count = 0usize;

        for element in element_starts(source) {
            let element = element?;
            if element.name != RECORD_ELEMENT {
                continue;
            }
            record_count += 1;

            match element.attribute(TYPE_ATTRIBUTE) {
                Some(record_type) => {
                    if !discovered.contains(record_type) {
                        trace!(record_type, "discovered record type");
                        discovered.insert(RecordTypeName::from(record_type));
                    }
                }
                None => trace!(record_count, "record without type attribute"),
            }
        }

        let (importable, unsupported): (Vec<_>, Vec<_>) = discovered
            .into_iter()
            .partition(|name| self.catalog.contains(name.as_str()));

        debug!(
            record_count,
            importable = importable.len(),
            unsupported = unsupported.len(),
            "survey complete"
        );

        Ok(SurveyReport {
            importable,
            unsupported,
            record_count,
        })
    }
}
