pub mod sentiment;
pub mod price_predictor;
pub mod provider;
pub mod error;

pub use sentiment::SentimentClient;
pub use price_predictor::PricePredictorClient;
pub use provider::{Classification, SentimentClassifier, SequenceForecaster};
pub use error::{MLError, MLResult};

use serde::Serialize;
use std::time::Duration;

/// Configuration for ML services
#[derive(Debug, Clone)]
pub struct MLConfig {
    pub sentiment_url: String,
    pub price_predictor_url: String,
    pub timeout: Duration,
}

impl Default for MLConfig {
    fn default() -> Self {
        Self {
            sentiment_url: std::env::var("ML_SENTIMENT_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            price_predictor_url: std::env::var("ML_PRICE_PREDICTOR_URL")
                .unwrap_or_else(|_| "http://localhost:8003".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Reachability of each model service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelHealth {
    pub sentiment: bool,
    pub price_predictor: bool,
}

/// Both model services
#[derive(Clone)]
pub struct MLClient {
    pub sentiment: SentimentClient,
    pub price_predictor: PricePredictorClient,
}

impl MLClient {
    pub fn new(config: MLConfig) -> Self {
        Self {
            sentiment: SentimentClient::new(config.sentiment_url.clone(), config.timeout),
            price_predictor: PricePredictorClient::new(config.price_predictor_url.clone(), config.timeout),
        }
    }

    /// Probe both services concurrently. An unreachable service counts as down.
    pub async fn health(&self) -> ModelHealth {
        let (sentiment, price_predictor) =
            tokio::join!(self.sentiment.health(), self.price_predictor.health());

        if let Err(ref e) = sentiment {
            tracing::debug!("Sentiment service health check failed: {}", e);
        }
        if let Err(ref e) = price_predictor {
            tracing::debug!("Price predictor health check failed: {}", e);
        }

        ModelHealth {
            sentiment: sentiment.unwrap_or(false),
            price_predictor: price_predictor.unwrap_or(false),
        }
    }
}
