//! The concrete refresh steps, each wrapping one component.

use analysis_core::AnalysisError;
use async_trait::async_trait;
use data_loader::{MacroFetcher, MarketFetcher, NewsFetcher};
use fear_greed_index::FgiCalculator;
use market_store::MarketStore;
use price_forecaster::PriceForecaster;
use recommendation_engine::RecommendationEngine;
use sentiment_analysis::SentimentScorer;
use std::path::PathBuf;
use std::sync::Arc;

use crate::step::PipelineStep;

pub struct FetchMarket(pub MarketFetcher);

#[async_trait]
impl PipelineStep for FetchMarket {
    fn name(&self) -> &'static str {
        "fetch_market"
    }

    fn is_soft(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let added = self.0.run().await?;
        Ok(format!("{} new bars", added))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroSeries {
    InterestRate,
    Gdp,
    Inflation,
}

pub struct FetchMacro {
    pub fetcher: Arc<MacroFetcher>,
    pub series: MacroSeries,
    pub indicator: String,
}

#[async_trait]
impl PipelineStep for FetchMacro {
    fn name(&self) -> &'static str {
        match self.series {
            MacroSeries::InterestRate => "fetch_interest_rate",
            MacroSeries::Gdp => "fetch_gdp",
            MacroSeries::Inflation => "fetch_inflation",
        }
    }

    fn is_soft(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let years = match self.series {
            MacroSeries::InterestRate => self.fetcher.interest_rates(&self.indicator).await?,
            MacroSeries::Gdp => self.fetcher.gdp(&self.indicator).await?,
            MacroSeries::Inflation => self.fetcher.inflation(&self.indicator).await?,
        };
        Ok(format!("{} years of {}", years, self.indicator))
    }
}

pub struct FetchNews(pub NewsFetcher);

#[async_trait]
impl PipelineStep for FetchNews {
    fn name(&self) -> &'static str {
        "fetch_news"
    }

    fn is_soft(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let cached = self.0.run().await?;
        Ok(format!("{} articles cached", cached))
    }
}

pub struct ScoreSentiment {
    pub scorer: SentimentScorer,
    pub store: MarketStore,
}

#[async_trait]
impl PipelineStep for ScoreSentiment {
    fn name(&self) -> &'static str {
        "score_sentiment"
    }

    fn requires(&self) -> Vec<PathBuf> {
        let paths = self.store.paths();
        vec![paths.news(), paths.stocks()]
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let record = self.scorer.run().await?;
        Ok(format!(
            "{} ({:.3}) for {}",
            record.overall_sentiment, record.sentiment_score, record.date
        ))
    }
}

pub struct ForecastPrice {
    pub forecaster: PriceForecaster,
    pub store: MarketStore,
}

#[async_trait]
impl PipelineStep for ForecastPrice {
    fn name(&self) -> &'static str {
        "forecast_price"
    }

    fn requires(&self) -> Vec<PathBuf> {
        vec![self.store.paths().stocks()]
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let forecast = self.forecaster.run().await?;
        Ok(format!(
            "{:.2} for {}",
            forecast.record.predicted_price, forecast.record.date
        ))
    }
}

pub struct ComputeFgi {
    pub calculator: FgiCalculator,
    pub store: MarketStore,
}

#[async_trait]
impl PipelineStep for ComputeFgi {
    fn name(&self) -> &'static str {
        "compute_fgi"
    }

    fn requires(&self) -> Vec<PathBuf> {
        let paths = self.store.paths();
        vec![
            paths.fgi_input(),
            paths.predictions(),
            paths.interest_rate(),
            paths.gdp(),
            paths.inflation(),
        ]
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let series = self.calculator.run()?;
        match series.last() {
            Some(tomorrow) => Ok(format!(
                "{:.1} ({}) for {}",
                tomorrow.fgi_normalized, tomorrow.market_sentiment, tomorrow.date
            )),
            None => Ok("empty series".to_string()),
        }
    }
}

pub struct Recommend {
    pub engine: RecommendationEngine,
    pub store: MarketStore,
}

#[async_trait]
impl PipelineStep for Recommend {
    fn name(&self) -> &'static str {
        "recommend"
    }

    fn requires(&self) -> Vec<PathBuf> {
        let paths = self.store.paths();
        vec![
            paths.stocks(),
            paths.predictions(),
            paths.market_sentiment(),
            paths.fgi_output(),
        ]
    }

    async fn execute(&self) -> Result<String, AnalysisError> {
        let rec = self.engine.run()?;
        Ok(format!("{} for {}", rec.action, rec.date))
    }
}
