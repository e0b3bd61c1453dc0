//! Runs the refresh pipeline: fetch, score, forecast, FGI, recommend.
//!
//! Steps run one after another. Before each step its required files are
//! checked; a missing file is reported and the step is not attempted.
//! Fetch failures are soft, the later steps then use the files from the
//! previous run.

use analysis_core::{MacroSource, MarketDataSource, NewsSource, PipelineConfig};
use data_loader::{MacroFetcher, MarketFetcher, NewsFetcher};
use fear_greed_index::FgiCalculator;
use market_store::MarketStore;
use ml_client::{MLConfig, PricePredictorClient, SentimentClassifier, SequenceForecaster};
use polygon_client::PolygonClient;
use price_forecaster::PriceForecaster;
use recommendation_engine::RecommendationEngine;
use sentiment_analysis::{classifier_for, SentimentScorer};
use std::sync::Arc;
use worldbank_client::WorldBankClient;

pub mod step;
pub mod steps;

pub use step::{PipelineReport, PipelineStep, StepOutcome, StepReport};
use steps::{
    ComputeFgi, FetchMacro, FetchMarket, FetchNews, ForecastPrice, MacroSeries, Recommend,
    ScoreSentiment,
};

/// External collaborators of the pipeline
#[derive(Clone)]
pub struct Sources {
    pub market: Arc<dyn MarketDataSource>,
    pub news: Arc<dyn NewsSource>,
    pub macros: Arc<dyn MacroSource>,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub forecaster: Arc<dyn SequenceForecaster>,
}

impl Sources {
    /// Polygon for bars and news, World Bank for macro series and the ML
    /// services (or the lexicon classifier) configured through the environment.
    pub fn from_env(config: &PipelineConfig) -> Self {
        let polygon = Arc::new(PolygonClient::from_env());
        let ml = MLConfig::default();

        Self {
            market: polygon.clone(),
            news: polygon,
            macros: Arc::new(WorldBankClient::from_env(config.macro_country.clone())),
            classifier: classifier_for(config.classifier, &ml.sentiment_url),
            forecaster: Arc::new(PricePredictorClient::new(ml.price_predictor_url, ml.timeout)),
        }
    }
}

pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn with_steps(steps: Vec<Box<dyn PipelineStep>>) -> Self {
        Self { steps }
    }

    /// The standard step order. The forecast runs before the FGI because the
    /// FGI series ends with the forecast row.
    pub fn new(config: &PipelineConfig, sources: Sources) -> Self {
        let store = MarketStore::new(config.paths.clone());
        let macro_fetcher = Arc::new(MacroFetcher::new(sources.macros.clone(), store.clone()));
        let macro_step = |series, indicator: &str| -> Box<dyn PipelineStep> {
            Box::new(FetchMacro {
                fetcher: macro_fetcher.clone(),
                series,
                indicator: indicator.to_string(),
            })
        };

        let steps: Vec<Box<dyn PipelineStep>> = vec![
            Box::new(FetchMarket(
                MarketFetcher::new(
                    sources.market.clone(),
                    store.clone(),
                    config.calendar.clone(),
                    config.ticker.clone(),
                )
                .with_window(config.price_window_days, config.calendar_lookback_days),
            )),
            macro_step(MacroSeries::InterestRate, &config.interest_rate_indicator),
            macro_step(MacroSeries::Gdp, &config.gdp_indicator),
            macro_step(MacroSeries::Inflation, &config.inflation_indicator),
            Box::new(FetchNews(NewsFetcher::new(
                sources.news.clone(),
                store.clone(),
                config.news_query.clone(),
                config.news_max_articles,
            ))),
            Box::new(ScoreSentiment {
                scorer: SentimentScorer::new(
                    sources.classifier.clone(),
                    store.clone(),
                    config.calendar.clone(),
                ),
                store: store.clone(),
            }),
            Box::new(ForecastPrice {
                forecaster: PriceForecaster::new(
                    sources.forecaster.clone(),
                    store.clone(),
                    config.calendar.clone(),
                    config.sequence_length,
                    config.forecast_margin,
                ),
                store: store.clone(),
            }),
            Box::new(ComputeFgi {
                calculator: FgiCalculator::new(store.clone()),
                store: store.clone(),
            }),
            Box::new(Recommend {
                engine: RecommendationEngine::new(store.clone()),
                store,
            }),
        ];

        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. Never stops early; each step's outcome is
    /// recorded in the report.
    pub async fn run(&self) -> PipelineReport {
        let mut report = PipelineReport::default();

        for step in &self.steps {
            let outcome = match step.requires().into_iter().find(|p| !p.is_file()) {
                Some(missing) => StepOutcome::MissingDependency(missing),
                None => StepOutcome::from_result(step.execute().await, step.is_soft()),
            };

            match &outcome {
                StepOutcome::Completed(summary) => tracing::info!("{}: {}", step.name(), summary),
                StepOutcome::Skipped(reason) => {
                    tracing::warn!("{} skipped, using last-known data: {}", step.name(), reason)
                }
                StepOutcome::MissingDependency(path) => {
                    tracing::warn!("{} not run: {} not found", step.name(), path.display())
                }
                StepOutcome::Failed(reason) => tracing::error!("{} failed: {}", step.name(), reason),
            }

            report.steps.push(StepReport {
                step: step.name(),
                outcome,
            });
        }

        tracing::info!(
            "Pipeline finished: {}/{} steps completed",
            report.completed(),
            report.steps.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{
        AnalysisError, NewsArticle, PriceRecord, TradingCalendar, YearValue,
    };
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use ml_client::{MLError, MLResult};
    use sentiment_analysis::LexiconClassifier;

    struct SyntheticMarket;

    #[async_trait]
    impl MarketDataSource for SyntheticMarket {
        async fn daily_bars(
            &self,
            _ticker: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<PriceRecord>, AnalysisError> {
            let mut bars = Vec::new();
            let mut day = from;
            let mut close = 22000.0;
            while day <= to {
                close += 7.5;
                bars.push(PriceRecord {
                    date: day,
                    open: close - 5.0,
                    high: close + 40.0,
                    low: close - 40.0,
                    close,
                    volume: 0.0,
                });
                day += Duration::days(1);
            }
            Ok(bars)
        }
    }

    struct Unreachable;

    #[async_trait]
    impl MarketDataSource for Unreachable {
        async fn daily_bars(
            &self,
            _ticker: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<PriceRecord>, AnalysisError> {
            Err(AnalysisError::ApiError("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl NewsSource for Unreachable {
        async fn latest_articles(
            &self,
            _query: &str,
            _max_articles: usize,
        ) -> Result<Vec<NewsArticle>, AnalysisError> {
            Err(AnalysisError::ApiError("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl MacroSource for Unreachable {
        async fn yearly_series(&self, _indicator: &str) -> Result<Vec<YearValue>, AnalysisError> {
            Err(AnalysisError::ApiError("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl SequenceForecaster for Unreachable {
        async fn predict_next(&self, _scaled: &[f64]) -> MLResult<f64> {
            Err(MLError::ServiceUnavailable("connection refused".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "unreachable"
        }
    }

    struct Headlines;

    #[async_trait]
    impl NewsSource for Headlines {
        async fn latest_articles(
            &self,
            _query: &str,
            _max_articles: usize,
        ) -> Result<Vec<NewsArticle>, AnalysisError> {
            Ok(["Nifty rallies to record high", "Banks surge on strong earnings", "Markets steady"]
                .iter()
                .enumerate()
                .map(|(i, title)| NewsArticle {
                    title: title.to_string(),
                    source: "Wire".to_string(),
                    published_at: Utc.with_ymd_and_hms(2025, 1, 2, 9, i as u32, 0).unwrap(),
                    description: None,
                    url: format!("https://news.example/{}", i),
                })
                .collect())
        }
    }

    struct FlatMacro;

    #[async_trait]
    impl MacroSource for FlatMacro {
        async fn yearly_series(&self, _indicator: &str) -> Result<Vec<YearValue>, AnalysisError> {
            Ok(vec![
                YearValue { year: 2022, value: 5.5 },
                YearValue { year: 2023, value: 5.9 },
            ])
        }
    }

    /// Predicts the top of the scaled window, i.e. the highest recent close
    struct TopOfRange;

    #[async_trait]
    impl SequenceForecaster for TopOfRange {
        async fn predict_next(&self, _scaled: &[f64]) -> MLResult<f64> {
            Ok(1.05)
        }

        fn backend_name(&self) -> &'static str {
            "top"
        }
    }

    fn test_config() -> PipelineConfig {
        let dir = std::env::temp_dir().join(format!("pipeline-{}", uuid::Uuid::new_v4()));
        let mut config = PipelineConfig::default().with_data_dir(dir);
        config.calendar = TradingCalendar::weekdays_only();
        config
    }

    fn healthy_sources() -> Sources {
        Sources {
            market: Arc::new(SyntheticMarket),
            news: Arc::new(Headlines),
            macros: Arc::new(FlatMacro),
            classifier: Arc::new(LexiconClassifier::new()),
            forecaster: Arc::new(TopOfRange),
        }
    }

    #[test]
    fn test_step_order() {
        let pipeline = Pipeline::new(&test_config(), healthy_sources());
        assert_eq!(
            pipeline.step_names(),
            vec![
                "fetch_market",
                "fetch_interest_rate",
                "fetch_gdp",
                "fetch_inflation",
                "fetch_news",
                "score_sentiment",
                "forecast_price",
                "compute_fgi",
                "recommend",
            ]
        );
    }

    #[tokio::test]
    async fn test_full_run_produces_every_artifact() {
        let config = test_config();
        let pipeline = Pipeline::new(&config, healthy_sources());

        let report = pipeline.run().await;
        assert!(!report.has_problems(), "{}", report);
        assert_eq!(report.completed(), 9);

        let store = MarketStore::new(config.paths.clone());
        let prices = store.prices().load().unwrap();
        assert_eq!(prices.len(), 261);

        let rec = store.recommendations().latest().unwrap();
        let forecast = store.forecasts().latest().unwrap();
        assert_eq!(rec.date, forecast.date);
        assert!(rec.predicted_close > rec.today_close);
        assert_eq!(store.fgi().latest().unwrap().date, forecast.date);
        assert_eq!(store.sentiment().latest().unwrap().date, forecast.date);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let config = test_config();
        let pipeline = Pipeline::new(&config, healthy_sources());
        pipeline.run().await;
        pipeline.run().await;

        let store = MarketStore::new(config.paths.clone());
        assert_eq!(store.prices().load().unwrap().len(), 261);
        assert_eq!(store.forecasts().load().unwrap().len(), 1);
        assert_eq!(store.recommendations().load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_first_run_reports_missing_dependencies() {
        let config = test_config();
        let sources = Sources {
            market: Arc::new(Unreachable),
            news: Arc::new(Unreachable),
            macros: Arc::new(Unreachable),
            classifier: Arc::new(LexiconClassifier::new()),
            forecaster: Arc::new(Unreachable),
        };

        let report = Pipeline::new(&config, sources).run().await;
        assert_eq!(report.steps.len(), 9);
        assert!(matches!(report.outcome("fetch_market"), Some(StepOutcome::Skipped(_))));
        assert!(matches!(report.outcome("fetch_gdp"), Some(StepOutcome::Skipped(_))));
        assert_eq!(
            report.outcome("score_sentiment"),
            Some(&StepOutcome::MissingDependency(config.paths.news()))
        );
        assert_eq!(
            report.outcome("recommend"),
            Some(&StepOutcome::MissingDependency(config.paths.stocks()))
        );
        assert_eq!(report.completed(), 0);
    }

    #[tokio::test]
    async fn test_model_outage_keeps_last_known_forecast() {
        let config = test_config();
        Pipeline::new(&config, healthy_sources()).run().await;

        let mut sources = healthy_sources();
        sources.forecaster = Arc::new(Unreachable);
        let report = Pipeline::new(&config, sources).run().await;

        assert!(matches!(report.outcome("forecast_price"), Some(StepOutcome::Failed(_))));
        // later steps still run against the previous forecast
        assert!(report.outcome("compute_fgi").is_some_and(|o| o.is_completed()));
        assert!(report.outcome("recommend").is_some_and(|o| o.is_completed()));
    }

    #[tokio::test]
    async fn test_model_outage_on_a_later_day_skips_stale_recommendation() {
        let config = test_config();
        Pipeline::new(&config, healthy_sources()).run().await;

        // The forecast day has since closed, with the model still down
        let store = MarketStore::new(config.paths.clone());
        let stale = store.forecasts().latest().unwrap();
        let bar = PriceRecord {
            date: stale.date,
            open: 24000.0,
            high: 24100.0,
            low: 23900.0,
            close: 24050.0,
            volume: 0.0,
        };
        store.prices().merge_new(vec![bar.clone()]).unwrap();
        store.fgi_window().merge_new(vec![bar]).unwrap();
        let before = store.recommendations().load().unwrap();

        let mut sources = healthy_sources();
        sources.market = Arc::new(Unreachable);
        sources.forecaster = Arc::new(Unreachable);
        let report = Pipeline::new(&config, sources).run().await;

        assert!(matches!(report.outcome("forecast_price"), Some(StepOutcome::Failed(_))));
        assert!(matches!(report.outcome("compute_fgi"), Some(StepOutcome::Failed(_))));
        assert!(matches!(report.outcome("recommend"), Some(StepOutcome::Failed(_))));
        assert_eq!(store.recommendations().load().unwrap(), before);
    }

    #[test]
    fn test_outcome_classification() {
        let missing = AnalysisError::MissingArtifact("data/x.csv".into());
        assert_eq!(
            StepOutcome::from_result(Err(missing), false),
            StepOutcome::MissingDependency("data/x.csv".into())
        );
        assert!(matches!(
            StepOutcome::from_result(Err(AnalysisError::ApiError("429".into())), true),
            StepOutcome::Skipped(_)
        ));
        assert!(matches!(
            StepOutcome::from_result(Err(AnalysisError::ApiError("429".into())), false),
            StepOutcome::Failed(_)
        ));
    }
}
