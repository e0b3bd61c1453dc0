use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("API error: {0}")]
    ApiError(String),

    /// A file another step should have produced is not on disk.
    #[error("Missing artifact: {} not found", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
}

impl AnalysisError {
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, AnalysisError::MissingArtifact(_))
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::StorageError(e.to_string())
    }
}
