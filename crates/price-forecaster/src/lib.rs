use analysis_core::stats::MinMaxScaler;
use analysis_core::{AnalysisError, ForecastRecord, TradingCalendar};
use market_store::MarketStore;
use ml_client::SequenceForecaster;
use serde::Serialize;
use std::sync::Arc;

/// Next-day close with its uncertainty band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub record: ForecastRecord,
    pub lower: f64,
    pub upper: f64,
}

impl Forecast {
    pub fn new(record: ForecastRecord, margin: f64) -> Self {
        let price = record.predicted_price;
        Self {
            record,
            lower: price - margin,
            upper: price + margin,
        }
    }

    pub fn range(&self) -> [f64; 2] {
        [self.lower, self.upper]
    }
}

/// Scale the last `sequence_length` closes to [0, 1]. Returns the scaled
/// window and the fitted scaler.
pub fn prepare_sequence(
    closes: &[f64],
    sequence_length: usize,
) -> Result<(Vec<f64>, MinMaxScaler), AnalysisError> {
    if sequence_length == 0 || closes.len() < sequence_length {
        return Err(AnalysisError::InsufficientData(format!(
            "need {} closes for the forecast window, have {}",
            sequence_length,
            closes.len()
        )));
    }

    let window = &closes[closes.len() - sequence_length..];
    let scaler = MinMaxScaler::fit(window).ok_or_else(|| {
        AnalysisError::InsufficientData("empty forecast window".to_string())
    })?;
    let scaled = window.iter().map(|&c| scaler.transform(c)).collect();

    Ok((scaled, scaler))
}

pub struct PriceForecaster {
    model: Arc<dyn SequenceForecaster>,
    store: MarketStore,
    calendar: TradingCalendar,
    sequence_length: usize,
    margin: f64,
}

impl PriceForecaster {
    pub fn new(
        model: Arc<dyn SequenceForecaster>,
        store: MarketStore,
        calendar: TradingCalendar,
        sequence_length: usize,
        margin: f64,
    ) -> Self {
        Self {
            model,
            store,
            calendar,
            sequence_length,
            margin,
        }
    }

    /// Predict the close for the trading day after the last price and
    /// upsert it into the forecast table.
    pub async fn run(&self) -> Result<Forecast, AnalysisError> {
        let mut history = self.store.prices().load()?;
        history.sort_by_key(|r| r.date);
        let last_date = history
            .last()
            .map(|r| r.date)
            .ok_or_else(|| AnalysisError::InsufficientData("price history is empty".to_string()))?;

        let closes: Vec<f64> = history.iter().map(|r| r.close).collect();
        let (scaled, scaler) = prepare_sequence(&closes, self.sequence_length)?;

        let predicted_scaled = self.model.predict_next(&scaled).await?;
        let predicted_price = scaler.inverse_transform(predicted_scaled);

        let record = ForecastRecord {
            date: self.calendar.next_trading_day(last_date),
            predicted_price,
        };
        self.store.forecasts().upsert(record.clone())?;

        let forecast = Forecast::new(record, self.margin);
        tracing::info!(
            "Forecast for {} via {}: {:.2} [{:.2}, {:.2}]",
            forecast.record.date,
            self.model.backend_name(),
            forecast.record.predicted_price,
            forecast.lower,
            forecast.upper
        );

        Ok(forecast)
    }
}
