use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{MLError, MLResult};

/// Texts sent per request to the classifier service.
const BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPrediction {
    pub label: String,
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub predictions: Vec<SentimentPrediction>,
    #[serde(default)]
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
struct SentimentRequest<'a> {
    texts: &'a [String],
}

/// Client for the FinBERT classification service.
#[derive(Clone)]
pub struct SentimentClient {
    client: reqwest::Client,
    base_url: String,
}

impl SentimentClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Classify texts, one prediction per input in input order.
    pub async fn predict(&self, texts: &[String]) -> MLResult<Vec<SentimentPrediction>> {
        let mut predictions = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let response = self
                .client
                .post(format!("{}/predict", self.base_url))
                .json(&SentimentRequest { texts: batch })
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                    return Err(MLError::ModelNotLoaded);
                }
                return Err(MLError::ServiceUnavailable(format!("Status: {}", status)));
            }

            let result = response.json::<SentimentResponse>().await?;
            if result.predictions.len() != batch.len() {
                return Err(MLError::InvalidResponse(format!(
                    "expected {} predictions, got {}",
                    batch.len(),
                    result.predictions.len()
                )));
            }
            tracing::debug!(
                "Classified {} texts in {:.0}ms",
                batch.len(),
                result.processing_time_ms
            );
            predictions.extend(result.predictions);
        }

        Ok(predictions)
    }

    /// Check service health
    pub async fn health(&self) -> MLResult<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
