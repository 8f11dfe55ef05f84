//! Sample sinks
//!
//! A sink durably persists a `SampleBatch`. On device this is the platform
//! health store, reached through the C ABI; here the library provides a JSON
//! writer sink for CLI use and an in-memory sink.

use crate::types::SampleBatch;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Errors reported by a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode batch: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Batch rejected: {0}")]
    Rejected(String),
}

/// Acknowledgement returned once a sink has accepted a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkAck {
    pub batch_id: Uuid,
    pub accepted: usize,
}

/// Destination for generated batches
///
/// The batch is moved into the sink; callers keep no copy once it is handed off.
pub trait SampleSink {
    fn submit(&mut self, batch: SampleBatch) -> Result<SinkAck, SinkError>;
}

/// Output encoding of `JsonSink`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One sample per line
    Ndjson,
    /// The whole batch as one JSON object
    Json,
    /// Pretty-printed batch
    JsonPretty,
}

/// Sink that serializes batches to a writer
pub struct JsonSink<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SampleSink for JsonSink<W> {
    fn submit(&mut self, batch: SampleBatch) -> Result<SinkAck, SinkError> {
        match self.format {
            OutputFormat::Ndjson => {
                for sample in batch.iter() {
                    serde_json::to_writer(&mut self.writer, sample)?;
                    self.writer.write_all(b"\n")?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, &batch)?;
                self.writer.write_all(b"\n")?;
            }
            OutputFormat::JsonPretty => {
                serde_json::to_writer_pretty(&mut self.writer, &batch)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;

        let ack = SinkAck {
            batch_id: batch.batch_id,
            accepted: batch.len(),
        };
        info!(batch_id = %ack.batch_id, accepted = ack.accepted, "batch written");
        Ok(ack)
    }
}

/// Sink that keeps every accepted batch in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<SampleBatch>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[SampleBatch] {
        &self.batches
    }

    pub fn total_samples(&self) -> usize {
        self.batches.iter().map(SampleBatch::len).sum()
    }

    pub fn into_batches(self) -> Vec<SampleBatch> {
        self.batches
    }
}

impl SampleSink for MemorySink {
    fn submit(&mut self, batch: SampleBatch) -> Result<SinkAck, SinkError> {
        let ack = SinkAck {
            batch_id: batch.batch_id,
            accepted: batch.len(),
        };
        self.batches.push(batch);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SampleValue, SyntheticSample, Unit};
    use chrono::{DateTime, Duration, Utc};

    fn batch(len: usize) -> SampleBatch {
        let anchor = "2024-01-15T08:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut batch = SampleBatch::new(
            "HKQuantityTypeIdentifierStepCount".into(),
            anchor,
            len as u32,
        );
        for k in 0..len {
            let at = anchor - Duration::days(k as i64);
            batch.samples.push(SyntheticSample {
                record_type: batch.record_type.clone(),
                value: SampleValue::Quantity {
                    value: 10.0 + k as f64,
                    unit: Unit::Count,
                },
                start: at,
                end: at,
            });
        }
        batch
    }

    #[test]
    fn test_ndjson_writes_one_line_per_sample() {
        let mut sink = JsonSink::new(Vec::new(), OutputFormat::Ndjson);
        let ack = sink.submit(batch(3)).unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();

        assert_eq!(ack.accepted, 3);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "HKQuantityTypeIdentifierStepCount");
        assert_eq!(first["value"]["value"], 10.0);
    }

    #[test]
    fn test_json_writes_whole_batch() {
        let batch = batch(2);
        let batch_id = batch.batch_id;
        let mut sink = JsonSink::new(Vec::new(), OutputFormat::JsonPretty);
        let ack = sink.submit(batch).unwrap();

        let parsed: SampleBatch = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(parsed.batch_id, batch_id);
        assert_eq!(parsed.samples.len(), 2);
        assert_eq!(ack.batch_id, batch_id);
    }

    #[test]
    fn test_memory_sink_keeps_batches() {
        let mut sink = MemorySink::new();
        sink.submit(batch(2)).unwrap();
        sink.submit(batch(5)).unwrap();

        assert_eq!(sink.batches().len(), 2);
        assert_eq!(sink.total_samples(), 7);
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut sink = JsonSink::new(BrokenWriter, OutputFormat::Json);
        assert!(sink.submit(batch(1)).is_err());
    }
}
