use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AnalysisError, NewsArticle, PriceRecord, YearValue};

/// A record with a unique key inside its table (trading date, year or URL)
pub trait Keyed {
    type Key: Ord + Clone + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}

/// Source of daily index bars
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn daily_bars(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceRecord>, AnalysisError>;
}

/// Source of recent news articles
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn latest_articles(
        &self,
        query: &str,
        max_articles: usize,
    ) -> Result<Vec<NewsArticle>, AnalysisError>;
}

/// Source of yearly macroeconomic series (interest rate, GDP, inflation)
#[async_trait]
pub trait MacroSource: Send + Sync {
    async fn yearly_series(&self, indicator: &str) -> Result<Vec<YearValue>, AnalysisError>;
}
