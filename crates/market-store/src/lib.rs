//! Typed CSV tables backing the pipeline.
//!
//! Every component reads and writes through [`CsvTable`]; [`MarketStore`]
//! hands out the table for each artifact under one data directory.

mod table;

pub use table::{dedup_keep_last, CsvTable};

use analysis_core::{
    DataPaths, FgiRecord, ForecastRecord, GdpRecord, InflationRecord, InterestRateRecord,
    NewsArticle, PriceRecord, Recommendation, ScoredArticle, SentimentRecord,
};

#[derive(Debug, Clone)]
pub struct MarketStore {
    paths: DataPaths,
}

impl MarketStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Full price history
    pub fn prices(&self) -> CsvTable<PriceRecord> {
        CsvTable::new(self.paths.stocks())
    }

    /// Rolling price window the FGI is computed over
    pub fn fgi_window(&self) -> CsvTable<PriceRecord> {
        CsvTable::new(self.paths.fgi_input())
    }

    pub fn interest_rates(&self) -> CsvTable<InterestRateRecord> {
        CsvTable::new(self.paths.interest_rate())
    }

    pub fn gdp(&self) -> CsvTable<GdpRecord> {
        CsvTable::new(self.paths.gdp())
    }

    pub fn inflation(&self) -> CsvTable<InflationRecord> {
        CsvTable::new(self.paths.inflation())
    }

    pub fn news(&self) -> CsvTable<NewsArticle> {
        CsvTable::new(self.paths.news())
    }

    pub fn scored_news(&self) -> CsvTable<ScoredArticle> {
        CsvTable::new(self.paths.news_sentiment())
    }

    pub fn sentiment(&self) -> CsvTable<SentimentRecord> {
        CsvTable::new(self.paths.market_sentiment())
    }

    pub fn fgi(&self) -> CsvTable<FgiRecord> {
        CsvTable::new(self.paths.fgi_output())
    }

    pub fn forecasts(&self) -> CsvTable<ForecastRecord> {
        CsvTable::new(self.paths.predictions())
    }

    pub fn recommendations(&self) -> CsvTable<Recommendation> {
        CsvTable::new(self.paths.recommendations())
    }
}
