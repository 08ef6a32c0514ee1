//! Error types for the audio analysis engine

use thiserror::Error;

/// Errors that can occur during audio analysis
///
/// Only [`AnalysisError::DecodingError`] escapes a per-track analysis; numeric
/// sub-analyses degrade to fallback values instead of failing.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio file cannot be opened or decoded
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Processing error during analysis
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// File system error (metadata lookup, cache writes)
    #[error("I/O error: {0}")]
    Io(String),

    /// Cache record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Serialization(err.to_string())
    }
}
