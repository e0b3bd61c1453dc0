use analysis_core::{AnalysisError, MarketDataSource, PriceRecord, TradingCalendar};
use chrono::{Duration, NaiveDate, Utc};
use market_store::MarketStore;
use std::sync::Arc;

/// Pulls daily bars for the configured index into the price history and the
/// rolling FGI input window.
pub struct MarketFetcher {
    source: Arc<dyn MarketDataSource>,
    store: MarketStore,
    calendar: TradingCalendar,
    ticker: String,
    window_days: usize,
    lookback_days: i64,
}

impl MarketFetcher {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: MarketStore,
        calendar: TradingCalendar,
        ticker: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            calendar,
            ticker: ticker.into(),
            window_days: 261,
            lookback_days: 400,
        }
    }

    pub fn with_window(mut self, window_days: usize, lookback_days: i64) -> Self {
        self.window_days = window_days;
        self.lookback_days = lookback_days;
        self
    }

    pub async fn run(&self) -> Result<usize, AnalysisError> {
        self.run_for(Utc::now().date_naive()).await
    }

    /// Fetch the trading-day window ending the day after `today`. Returns the
    /// number of bars added to the price history.
    pub async fn run_for(&self, today: NaiveDate) -> Result<usize, AnalysisError> {
        let end = today + Duration::days(1);
        let days = self
            .calendar
            .last_trading_days(end, self.window_days, self.lookback_days);
        let (Some(&from), Some(&to)) = (days.first(), days.last()) else {
            tracing::warn!("No trading days in the {} days before {}", self.lookback_days, end);
            return Ok(0);
        };

        let bars = self.source.daily_bars(&self.ticker, from, to).await?;
        let bars: Vec<PriceRecord> = bars
            .into_iter()
            .filter(|b| b.date >= from && b.date <= to && self.calendar.is_trading_day(b.date))
            .collect();

        if bars.is_empty() {
            tracing::warn!("No bars returned for {} between {} and {}", self.ticker, from, to);
            return Ok(0);
        }

        let fetched = bars.len();
        let added = self.store.prices().merge_new(bars.clone())?;
        let window = self.store.fgi_window();
        window.merge_new(bars)?;
        let dropped = window.retain_last(self.window_days)?;

        tracing::info!(
            "Fetched {} bars for {} ({} to {}): {} new, {} aged out of the FGI window",
            fetched,
            self.ticker,
            from,
            to,
            added,
            dropped
        );

        Ok(added)
    }
}
