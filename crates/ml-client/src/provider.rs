use analysis_core::SentimentLabel;
use async_trait::async_trait;

use crate::error::{MLError, MLResult};
use crate::price_predictor::PricePredictorClient;
use crate::sentiment::SentimentClient;

/// Label and confidence for one text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: SentimentLabel,
    pub score: f64,
}

/// Backend-agnostic three-way sentiment classifier.
///
/// Implemented by the HTTP FinBERT client and by the offline lexicon
/// classifier in `sentiment-analysis`.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// One classification per text, in input order.
    async fn classify(&self, texts: &[String]) -> MLResult<Vec<Classification>>;

    fn backend_name(&self) -> &'static str;
}

/// Pretrained sequence model predicting the next value of a scaled series.
#[async_trait]
pub trait SequenceForecaster: Send + Sync {
    async fn predict_next(&self, scaled: &[f64]) -> MLResult<f64>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl SentimentClassifier for SentimentClient {
    async fn classify(&self, texts: &[String]) -> MLResult<Vec<Classification>> {
        self.predict(texts)
            .await?
            .into_iter()
            .map(|p| {
                let label = SentimentLabel::parse(&p.label).ok_or_else(|| {
                    MLError::InvalidResponse(format!("unknown sentiment label '{}'", p.label))
                })?;
                Ok(Classification {
                    label,
                    score: p.confidence,
                })
            })
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "finbert-http"
    }
}

#[async_trait]
impl SequenceForecaster for PricePredictorClient {
    async fn predict_next(&self, scaled: &[f64]) -> MLResult<f64> {
        PricePredictorClient::predict_next(self, scaled).await
    }

    fn backend_name(&self) -> &'static str {
        "lstm-http"
    }
}
