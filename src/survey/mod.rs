//! Health export surveying
//!
//! This module scans an Apple Health XML export in a single forward pass and
//! reports which importable record types it contains. The scan never builds a
//! document tree; it consumes a lazy sequence of element-start events.

mod events;
mod surveyor;

pub use events::{element_starts, ElementStart, ElementStarts};
pub use surveyor::{RecordTypeSurveyor, SurveyReport, RECORD_ELEMENT, TYPE_ATTRIBUTE};
