use analysis_core::{AnalysisError, MacroSource, YearValue};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://api.worldbank.org";

/// World Bank indicator API client for yearly macro series of one country.
#[derive(Clone)]
pub struct WorldBankClient {
    base_url: String,
    country: String,
    client: Client,
}

impl WorldBankClient {
    pub fn new(country: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: BASE_URL.to_string(),
            country: country.into(),
            client,
        }
    }

    /// Honours `WORLD_BANK_URL` when set.
    pub fn from_env(country: impl Into<String>) -> Self {
        let client = Self::new(country);
        match std::env::var("WORLD_BANK_URL") {
            Ok(url) if !url.trim().is_empty() => client.with_base_url(url),
            _ => client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Yearly values of `indicator`, oldest first, nulls skipped.
    pub async fn get_indicator(&self, indicator: &str) -> Result<Vec<YearValue>, AnalysisError> {
        let url = format!(
            "{}/v2/country/{}/indicator/{}",
            self.base_url, self.country, indicator
        );

        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("per_page", "1000")])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let series = parse_indicator_payload(&body)?;
        tracing::debug!(
            "World Bank returned {} yearly values for {}/{}",
            series.len(),
            self.country,
            indicator
        );
        Ok(series)
    }
}

#[async_trait]
impl MacroSource for WorldBankClient {
    async fn yearly_series(&self, indicator: &str) -> Result<Vec<YearValue>, AnalysisError> {
        self.get_indicator(indicator).await
    }
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: Option<f64>,
}

/// Decode a `[meta, [{date, value}, ...]]` payload.
///
/// Error payloads (`[{"message": ...}]`) and any other shape are rejected as
/// invalid data. Observations with a null value or a non-numeric year are skipped.
pub fn parse_indicator_payload(body: &Value) -> Result<Vec<YearValue>, AnalysisError> {
    let rows = match body.as_array().map(|a| a.as_slice()) {
        Some([_meta, rows, ..]) if rows.is_array() => rows,
        _ => {
            return Err(AnalysisError::InvalidData(
                "expected [metadata, observations] payload".to_string(),
            ))
        }
    };

    let observations: Vec<Observation> = serde_json::from_value(rows.clone())
        .map_err(|e| AnalysisError::InvalidData(e.to_string()))?;

    let mut series: Vec<YearValue> = observations
        .into_iter()
        .filter_map(|o| {
            let value = o.value?;
            let year = o.date.trim().parse().ok()?;
            Some(YearValue { year, value })
        })
        .collect();
    series.sort_by_key(|v| v.year);

    Ok(series)
}
