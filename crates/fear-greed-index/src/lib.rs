//! Fear & Greed Index over the rolling price window plus the forecast row.
//!
//! Every run recomputes the whole series, so normalization is relative to
//! the current window and past scores can move between runs.

pub mod scoring;

use analysis_core::stats::normalize_0_100;
use analysis_core::{
    AnalysisError, FgiBand, FgiRecord, ForecastRecord, GdpRecord, InflationRecord,
    InterestRateRecord, PriceRecord, YearlyIndicator,
};
use chrono::{Datelike, Utc};
use market_store::MarketStore;
use technical_analysis::{atr, ema, rolling_mean, rsi, sma, Candle};

pub const SMA_SHORT: usize = 50;
pub const SMA_LONG: usize = 200;
pub const ATR_PERIOD: usize = 14;
pub const RSI_PERIOD: usize = 14;
/// Rows in the ATR baseline the volatility signal compares against
pub const ATR_BASELINE: usize = 50;

/// Highest composite score any row can reach
pub const MAX_COMPOSITE: i32 = 6;

/// Macro inputs shared by every row of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroSnapshot {
    pub interest_rate: f64,
    pub gdp: f64,
    pub inflation: f64,
}

impl MacroSnapshot {
    /// Interest rate from the latest year on file; GDP and inflation from the
    /// latest year not after `current_year`.
    pub fn select(
        interest: &[InterestRateRecord],
        gdp: &[GdpRecord],
        inflation: &[InflationRecord],
        current_year: i32,
    ) -> Result<Self, AnalysisError> {
        let interest_rate = latest_value(interest, None)
            .ok_or_else(|| AnalysisError::InsufficientData("no interest rate data".to_string()))?;
        let gdp = latest_value(gdp, Some(current_year))
            .ok_or_else(|| AnalysisError::InsufficientData(format!("no GDP data up to {}", current_year)))?;
        let inflation = latest_value(inflation, Some(current_year)).ok_or_else(|| {
            AnalysisError::InsufficientData(format!("no inflation data up to {}", current_year))
        })?;

        Ok(Self {
            interest_rate,
            gdp,
            inflation,
        })
    }

    /// Score contribution of the macro signals
    pub fn score(&self) -> i32 {
        scoring::interest_rate_score(self.interest_rate)
            + scoring::gdp_score(self.gdp)
            + scoring::inflation_score(self.inflation)
    }
}

fn latest_value<R: YearlyIndicator>(rows: &[R], max_year: Option<i32>) -> Option<f64> {
    rows.iter()
        .filter(|r| max_year.map_or(true, |y| r.year() <= y))
        .max_by_key(|r| r.year())
        .map(|r| r.value())
}

/// Annotate `window` plus a synthetic row for `forecast` with indicators,
/// composite score, normalized score and band.
pub fn compute_series(
    window: &[PriceRecord],
    forecast: &ForecastRecord,
    macros: &MacroSnapshot,
) -> Result<Vec<FgiRecord>, AnalysisError> {
    let last = window
        .last()
        .ok_or_else(|| AnalysisError::InsufficientData("price window is empty".to_string()))?;
    if forecast.date <= last.date {
        return Err(AnalysisError::InvalidData(format!(
            "forecast date {} is not after last price date {}",
            forecast.date, last.date
        )));
    }

    let mut dates: Vec<_> = window.iter().map(|r| r.date).collect();
    dates.push(forecast.date);

    let mut candles: Vec<Candle> = window
        .iter()
        .map(|r| Candle::new(r.high, r.low, r.close))
        .collect();
    candles.push(Candle::close_only(forecast.predicted_price));

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let sma_short = sma(&closes, SMA_SHORT);
    let sma_long = sma(&closes, SMA_LONG);
    let ema_short = ema(&closes, SMA_SHORT);
    let ema_long = ema(&closes, SMA_LONG);
    let tr = technical_analysis::true_range(&candles);
    let atr_14 = atr(&candles, ATR_PERIOD);
    let atr_baseline = rolling_mean(&atr_14, ATR_BASELINE);
    let rsi_14 = rsi(&closes, RSI_PERIOD);
    let macro_score = macros.score();

    let composite: Vec<i32> = (0..closes.len())
        .map(|i| {
            scoring::momentum_score(sma_short[i], sma_long[i])
                + scoring::rsi_score(rsi_14[i])
                + scoring::volatility_score(atr_14[i], atr_baseline[i])
                + macro_score
        })
        .collect();

    let composite_f: Vec<f64> = composite.iter().map(|&s| s as f64).collect();
    let normalized = normalize_0_100(&composite_f);

    let records = (0..closes.len())
        .map(|i| FgiRecord {
            date: dates[i],
            close: closes[i],
            sma_50: sma_short[i],
            sma_200: sma_long[i],
            ema_50: ema_short.get(i).copied(),
            ema_200: ema_long.get(i).copied(),
            true_range: tr[i],
            atr_14: atr_14[i],
            rsi_14: rsi_14[i],
            interest_rate: macros.interest_rate,
            fgi_score: composite[i],
            fgi_normalized: normalized[i],
            market_sentiment: FgiBand::from_score(normalized[i]),
        })
        .collect();

    Ok(records)
}

/// Loads the window, forecast and macro tables and rewrites the FGI series.
pub struct FgiCalculator {
    store: MarketStore,
}

impl FgiCalculator {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }

    pub fn run(&self) -> Result<Vec<FgiRecord>, AnalysisError> {
        self.run_for_year(Utc::now().year())
    }

    pub fn run_for_year(&self, current_year: i32) -> Result<Vec<FgiRecord>, AnalysisError> {
        let mut window = self.store.fgi_window().load()?;
        window.sort_by_key(|r| r.date);
        let forecast = self.store.forecasts().latest()?;

        let macros = MacroSnapshot::select(
            &self.store.interest_rates().load()?,
            &self.store.gdp().load()?,
            &self.store.inflation().load()?,
            current_year,
        )?;

        let series = compute_series(&window, &forecast, &macros)?;
        self.store.fgi().replace_all(&series)?;

        if let Some(tomorrow) = series.last() {
            tracing::info!(
                "FGI for {}: score {} normalized {:.1} ({})",
                tomorrow.date,
                tomorrow.fgi_score,
                tomorrow.fgi_normalized,
                tomorrow.market_sentiment
            );
        }

        Ok(series)
    }
}
