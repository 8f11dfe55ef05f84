//! Error types for Synheart Synth

use thiserror::Error;

use crate::sink::SinkError;

/// Errors that can occur while surveying exports or generating samples
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Input error: {0}")]
    InputError(String),

    #[error("Failed to parse health export: {0}")]
    ParseError(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),

    #[error("Invalid generation window: {0} days (must be positive)")]
    InvalidWindow(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}
