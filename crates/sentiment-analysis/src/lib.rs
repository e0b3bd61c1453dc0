use analysis_core::{
    AnalysisError, ClassifierBackend, NewsArticle, ScoredArticle, SentimentLabel, SentimentRecord,
    TradingCalendar,
};
use market_store::MarketStore;
use ml_client::{Classification, SentimentClassifier, SentimentClient};
use std::sync::Arc;
use std::time::Duration;

pub mod lexicon;
pub use lexicon::LexiconClassifier;

/// Dominant label over a batch of classified articles
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentAggregate {
    pub label: SentimentLabel,
    /// Mean confidence of the articles carrying `label`
    pub score: f64,
    pub negative_count: u32,
    pub neutral_count: u32,
    pub positive_count: u32,
}

impl SentimentAggregate {
    fn count(&self, label: SentimentLabel) -> u32 {
        match label {
            SentimentLabel::Negative => self.negative_count,
            SentimentLabel::Neutral => self.neutral_count,
            SentimentLabel::Positive => self.positive_count,
        }
    }
}

/// Majority vote over `results`. Ties go to the first label in
/// negative, neutral, positive order. `None` for an empty batch.
pub fn aggregate(results: &[Classification]) -> Option<SentimentAggregate> {
    if results.is_empty() {
        return None;
    }

    let count_of = |label: SentimentLabel| results.iter().filter(|c| c.label == label).count() as u32;
    let mut agg = SentimentAggregate {
        label: SentimentLabel::Negative,
        score: 0.0,
        negative_count: count_of(SentimentLabel::Negative),
        neutral_count: count_of(SentimentLabel::Neutral),
        positive_count: count_of(SentimentLabel::Positive),
    };

    for label in SentimentLabel::ALL {
        if agg.count(label) > agg.count(agg.label) {
            agg.label = label;
        }
    }

    let winners: Vec<f64> = results
        .iter()
        .filter(|c| c.label == agg.label)
        .map(|c| c.score)
        .collect();
    agg.score = winners.iter().sum::<f64>() / winners.len() as f64;

    Some(agg)
}

/// Build the classifier selected by configuration.
pub fn classifier_for(backend: ClassifierBackend, sentiment_url: &str) -> Arc<dyn SentimentClassifier> {
    match backend {
        ClassifierBackend::Http => Arc::new(SentimentClient::new(
            sentiment_url.to_string(),
            Duration::from_secs(60),
        )),
        ClassifierBackend::Lexicon => Arc::new(LexiconClassifier::new()),
    }
}

/// Classifies the cached news and records the daily aggregate.
pub struct SentimentScorer {
    classifier: Arc<dyn SentimentClassifier>,
    store: MarketStore,
    calendar: TradingCalendar,
}

impl SentimentScorer {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, store: MarketStore, calendar: TradingCalendar) -> Self {
        Self {
            classifier,
            store,
            calendar,
        }
    }

    /// Score every cached article, write the per-article results and upsert
    /// the aggregate for the next trading day after the last price date.
    pub async fn run(&self) -> Result<SentimentRecord, AnalysisError> {
        let articles: Vec<NewsArticle> = self.store.news().load()?;
        if articles.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "news cache has no articles to score".to_string(),
            ));
        }

        let last_price = self.store.prices().latest()?;
        let target_date = self.calendar.next_trading_day(last_price.date);

        let texts: Vec<String> = articles.iter().map(|a| a.classification_text()).collect();
        let results = self.classifier.classify(&texts).await?;
        if results.len() != articles.len() {
            return Err(AnalysisError::InvalidData(format!(
                "classifier returned {} results for {} articles",
                results.len(),
                articles.len()
            )));
        }

        let scored: Vec<ScoredArticle> = articles
            .into_iter()
            .zip(results.iter())
            .map(|(article, c)| ScoredArticle::new(article, c.label, c.score))
            .collect();
        self.store.scored_news().replace_all(&scored)?;

        let agg = aggregate(&results).ok_or_else(|| {
            AnalysisError::InsufficientData("no classifications to aggregate".to_string())
        })?;

        let record = SentimentRecord {
            date: target_date,
            overall_sentiment: agg.label,
            sentiment_score: agg.score,
            negative_count: agg.negative_count,
            neutral_count: agg.neutral_count,
            positive_count: agg.positive_count,
        };
        self.store.sentiment().upsert(record.clone())?;

        tracing::info!(
            "Scored {} articles with {}: {} ({:.3}) for {}",
            scored.len(),
            self.classifier.backend_name(),
            record.overall_sentiment,
            record.sentiment_score,
            record.date
        );

        Ok(record)
    }
}
