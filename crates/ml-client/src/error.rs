use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MLError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model not loaded")]
    ModelNotLoaded,
}

pub type MLResult<T> = Result<T, MLError>;

impl From<MLError> for AnalysisError {
    fn from(e: MLError) -> Self {
        match e {
            MLError::InvalidResponse(msg) => AnalysisError::InvalidData(msg),
            other => AnalysisError::ModelUnavailable(other.to_string()),
        }
    }
}
