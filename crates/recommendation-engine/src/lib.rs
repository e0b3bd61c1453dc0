use analysis_core::{Action, AnalysisError, FgiBand, Recommendation, SentimentLabel};
use chrono::NaiveDate;
use market_store::MarketStore;

/// FGI above this with positive news upgrades BUY
pub const STRONG_BUY_FGI: f64 = 75.0;
/// FGI at or below this with negative news upgrades SELL
pub const STRONG_SELL_FGI: f64 = 25.0;

/// Latest upstream values the rule table reads
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub date: NaiveDate,
    pub today_close: f64,
    pub predicted_close: f64,
    pub sentiment: SentimentLabel,
    pub fgi_score: f64,
    pub fgi_band: FgiBand,
}

/// Direction from the forecast alone.
pub fn base_action(today_close: f64, predicted_close: f64) -> Action {
    if predicted_close > today_close {
        Action::Buy
    } else if predicted_close < today_close {
        Action::Sell
    } else {
        Action::Hold
    }
}

/// Apply the rule table: forecast direction, strengthened when the FGI and
/// news sentiment agree with it.
pub fn decide(signals: &Signals) -> Action {
    match base_action(signals.today_close, signals.predicted_close) {
        Action::Buy
            if signals.fgi_score > STRONG_BUY_FGI && signals.sentiment == SentimentLabel::Positive =>
        {
            Action::StrongBuy
        }
        Action::Sell
            if signals.fgi_score <= STRONG_SELL_FGI && signals.sentiment == SentimentLabel::Negative =>
        {
            Action::StrongSell
        }
        action => action,
    }
}

pub fn recommend(signals: &Signals) -> Recommendation {
    Recommendation {
        date: signals.date,
        today_close: signals.today_close,
        predicted_close: signals.predicted_close,
        market_sentiment: signals.sentiment,
        fgi_score: signals.fgi_score,
        fgi_sentiment: signals.fgi_band,
        action: decide(signals),
    }
}

pub struct RecommendationEngine {
    store: MarketStore,
}

impl RecommendationEngine {
    pub fn new(store: MarketStore) -> Self {
        Self { store }
    }

    /// Latest row of price history, forecast, sentiment and FGI series.
    /// Fails naming the first missing file, and rejects a forecast that is
    /// not dated after the latest close.
    pub fn load_signals(&self) -> Result<Signals, AnalysisError> {
        let today = self.store.prices().latest()?;
        let forecast = self.store.forecasts().latest()?;
        let sentiment = self.store.sentiment().latest()?;
        let fgi = self.store.fgi().latest()?;

        if forecast.date <= today.date {
            return Err(AnalysisError::InvalidData(format!(
                "latest forecast is for {} but prices already run to {}",
                forecast.date, today.date
            )));
        }

        Ok(Signals {
            date: forecast.date,
            today_close: today.close,
            predicted_close: forecast.predicted_price,
            sentiment: sentiment.overall_sentiment,
            fgi_score: fgi.fgi_normalized,
            fgi_band: fgi.market_sentiment,
        })
    }

    pub fn run(&self) -> Result<Recommendation, AnalysisError> {
        let signals = self.load_signals()?;
        let recommendation = recommend(&signals);
        self.store.recommendations().upsert(recommendation.clone())?;

        tracing::info!(
            "Recommendation for {}: {} (close {:.2} -> {:.2}, FGI {:.1}, news {})",
            recommendation.date,
            recommendation.action,
            recommendation.today_close,
            recommendation.predicted_close,
            recommendation.fgi_score,
            recommendation.market_sentiment
        );

        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{DataPaths, FgiRecord, ForecastRecord, PriceRecord, SentimentRecord};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn signals(predicted: f64, fgi: f64, sentiment: SentimentLabel) -> Signals {
        Signals {
            date: d("2025-01-06"),
            today_close: 100.0,
            predicted_close: predicted,
            sentiment,
            fgi_score: fgi,
            fgi_band: FgiBand::from_score(fgi),
        }
    }

    #[test]
    fn test_strong_buy() {
        assert_eq!(decide(&signals(101.0, 80.0, SentimentLabel::Positive)), Action::StrongBuy);
    }

    #[test]
    fn test_strong_sell() {
        assert_eq!(decide(&signals(99.0, 10.0, SentimentLabel::Negative)), Action::StrongSell);
    }

    #[test]
    fn test_thresholds_are_strict_for_buy_inclusive_for_sell() {
        assert_eq!(decide(&signals(101.0, 75.0, SentimentLabel::Positive)), Action::Buy);
        assert_eq!(decide(&signals(99.0, 25.0, SentimentLabel::Negative)), Action::StrongSell);
        assert_eq!(decide(&signals(99.0, 25.1, SentimentLabel::Negative)), Action::Sell);
    }

    #[test]
    fn test_sentiment_must_agree() {
        assert_eq!(decide(&signals(101.0, 90.0, SentimentLabel::Neutral)), Action::Buy);
        assert_eq!(decide(&signals(99.0, 5.0, SentimentLabel::Positive)), Action::Sell);
    }

    #[test]
    fn test_hold_is_never_upgraded() {
        assert_eq!(decide(&signals(100.0, 99.0, SentimentLabel::Positive)), Action::Hold);
        assert_eq!(decide(&signals(100.0, 0.0, SentimentLabel::Negative)), Action::Hold);
    }

    #[test]
    fn test_monotonic_in_predicted_close() {
        for fgi in [0.0, 25.0, 50.0, 80.0] {
            for sentiment in SentimentLabel::ALL {
                let mut previous = i32::MIN;
                for predicted in [90.0, 99.9, 100.0, 100.1, 110.0] {
                    let score = decide(&signals(predicted, fgi, sentiment)).to_score();
                    assert!(score >= previous);
                    previous = score;
                }
            }
        }
    }

    fn seeded_store() -> MarketStore {
        let dir = std::env::temp_dir().join(format!("recommend-{}", uuid::Uuid::new_v4()));
        let store = MarketStore::new(DataPaths::new(dir));
        store
            .prices()
            .replace_all(&[PriceRecord {
                date: d("2025-01-03"),
                open: 23500.0,
                high: 23600.0,
                low: 23400.0,
                close: 23550.0,
                volume: 0.0,
            }])
            .unwrap();
        store
            .forecasts()
            .upsert(ForecastRecord {
                date: d("2025-01-06"),
                predicted_price: 23700.0,
            })
            .unwrap();
        store
            .sentiment()
            .upsert(SentimentRecord {
                date: d("2025-01-06"),
                overall_sentiment: SentimentLabel::Positive,
                sentiment_score: 0.81,
                negative_count: 1,
                neutral_count: 2,
                positive_count: 5,
            })
            .unwrap();
        store
    }

    fn fgi_row(normalized: f64) -> FgiRecord {
        FgiRecord {
            date: d("2025-01-06"),
            close: 23700.0,
            sma_50: None,
            sma_200: None,
            ema_50: Some(23600.0),
            ema_200: Some(23400.0),
            true_range: Some(471.0),
            atr_14: Some(300.0),
            rsi_14: Some(72.0),
            interest_rate: 6.5,
            fgi_score: 4,
            fgi_normalized: normalized,
            market_sentiment: FgiBand::from_score(normalized),
        }
    }

    #[test]
    fn test_engine_upserts_by_forecast_date() {
        let store = seeded_store();
        store.fgi().replace_all(&[fgi_row(80.0)]).unwrap();

        let engine = RecommendationEngine::new(store.clone());
        let rec = engine.run().unwrap();
        assert_eq!(rec.date, d("2025-01-06"));
        assert_eq!(rec.action, Action::StrongBuy);
        assert_eq!(rec.fgi_sentiment, FgiBand::ExtremeGreed);

        store.fgi().replace_all(&[fgi_row(60.0)]).unwrap();
        let rec = engine.run().unwrap();
        assert_eq!(rec.action, Action::Buy);

        let stored = store.recommendations().load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].action, Action::Buy);
    }

    #[test]
    fn test_engine_rejects_stale_forecast() {
        let store = seeded_store();
        store.fgi().replace_all(&[fgi_row(80.0)]).unwrap();
        // The next session closed but no new forecast was made for the day after
        store
            .prices()
            .merge_new(vec![PriceRecord {
                date: d("2025-01-06"),
                open: 23550.0,
                high: 23800.0,
                low: 23500.0,
                close: 23650.0,
                volume: 0.0,
            }])
            .unwrap();

        let err = RecommendationEngine::new(store.clone()).run().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidData(_)));
        assert!(err.to_string().contains("2025-01-06"));
        assert!(!store.recommendations().exists());
    }

    #[test]
    fn test_engine_names_missing_file() {
        let store = seeded_store();
        let err = RecommendationEngine::new(store).run().unwrap_err();
        assert!(err.is_missing_artifact());
        assert!(err.to_string().contains("fgi_data_with_fgi.csv"));
    }
}
