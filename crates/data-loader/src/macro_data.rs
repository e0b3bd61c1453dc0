use analysis_core::stats::round_to;
use analysis_core::{
    AnalysisError, GdpRecord, InflationRecord, InterestRateRecord, MacroSource, YearlyIndicator,
};
use market_store::{CsvTable, MarketStore};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Decimal places kept per series
const INTEREST_RATE_DECIMALS: u32 = 4;
const GDP_DECIMALS: u32 = 2;
const INFLATION_DECIMALS: u32 = 2;

/// Refreshes the yearly interest rate, GDP and inflation tables.
pub struct MacroFetcher {
    source: Arc<dyn MacroSource>,
    store: MarketStore,
}

impl MacroFetcher {
    pub fn new(source: Arc<dyn MacroSource>, store: MarketStore) -> Self {
        Self { source, store }
    }

    pub async fn interest_rates(&self, indicator: &str) -> Result<usize, AnalysisError> {
        self.fetch_into::<InterestRateRecord>(indicator, self.store.interest_rates(), INTEREST_RATE_DECIMALS)
            .await
    }

    pub async fn gdp(&self, indicator: &str) -> Result<usize, AnalysisError> {
        self.fetch_into::<GdpRecord>(indicator, self.store.gdp(), GDP_DECIMALS)
            .await
    }

    pub async fn inflation(&self, indicator: &str) -> Result<usize, AnalysisError> {
        self.fetch_into::<InflationRecord>(indicator, self.store.inflation(), INFLATION_DECIMALS)
            .await
    }

    /// Overwrite `table` with the rounded series, oldest year first. An empty
    /// series leaves the table untouched.
    async fn fetch_into<R>(
        &self,
        indicator: &str,
        table: CsvTable<R>,
        decimals: u32,
    ) -> Result<usize, AnalysisError>
    where
        R: YearlyIndicator + Serialize + DeserializeOwned,
    {
        let series = self.source.yearly_series(indicator).await?;
        if series.is_empty() {
            tracing::warn!("Indicator {} returned no values, keeping {}", indicator, table.path().display());
            return Ok(0);
        }

        let mut rows: Vec<R> = series
            .iter()
            .map(|yv| R::from_year_value(yv.year, round_to(yv.value, decimals)))
            .collect();
        rows.sort_by_key(|r| r.year());
        table.replace_all(&rows)?;

        tracing::info!("Stored {} years of {} in {}", rows.len(), indicator, table.path().display());
        Ok(rows.len())
    }
}
