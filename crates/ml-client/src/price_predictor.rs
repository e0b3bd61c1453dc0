use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{MLError, MLResult};

#[derive(Debug, Clone, Serialize)]
struct NextValueRequest<'a> {
    sequence: &'a [f64],
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextValueResponse {
    pub prediction: f64,
}

/// Client for the LSTM next-close service. Inputs and output are in
/// min-max scaled units; scaling is the caller's job.
#[derive(Clone)]
pub struct PricePredictorClient {
    client: reqwest::Client,
    base_url: String,
}

impl PricePredictorClient {
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

    /// Predict the value following `sequence`.
    pub async fn predict_next(&self, sequence: &[f64]) -> MLResult<f64> {
        let response = self
            .client
            .post(format!("{}/predict-next", self.base_url))
            .json(&NextValueRequest { sequence })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                return Err(MLError::ModelNotLoaded);
            }
            return Err(MLError::ServiceUnavailable(format!("Status: {}", status)));
        }

        let result = response.json::<NextValueResponse>().await?;
        Ok(result.prediction)
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
