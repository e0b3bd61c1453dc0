//! Market Routes
//!
//! Read-only views over the price, forecast, news, FGI and recommendation
//! tables. Field names follow the CSV column names the mobile client reads.

use analysis_core::{Action, FgiBand, FgiRecord, PriceRecord, Recommendation, SentimentLabel};
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use price_forecaster::Forecast;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{AppError, AppState};

const LATEST_NEWS_COUNT: usize = 5;
const PAST_PREDICTION_COUNT: usize = 7;
const PAST_FGI_COUNT: usize = 7;

/// Response for `/predict`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictionSummary {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Predicted_Price")]
    pub predicted_price: f64,
    #[serde(rename = "Prediction_Range")]
    pub prediction_range: [f64; 2],
    #[serde(rename = "Overall_Market_Sentiment")]
    pub overall_market_sentiment: SentimentLabel,
    #[serde(rename = "Today_Close")]
    pub today_close: f64,
    #[serde(rename = "FGI Score")]
    pub fgi_score: f64,
    #[serde(rename = "FGI_Sentiment")]
    pub fgi_sentiment: FgiBand,
    #[serde(rename = "Recommendation")]
    pub recommendation: Action,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Headline {
    pub title: String,
    pub source: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "Sentiment")]
    pub sentiment: SentimentLabel,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PastPrediction {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Predicted_Price")]
    pub predicted_price: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FgiPoint {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "FGI_Normalized")]
    pub fgi_normalized: f64,
    #[serde(rename = "Market_Sentiment")]
    pub market_sentiment: FgiBand,
}

impl From<&FgiRecord> for FgiPoint {
    fn from(r: &FgiRecord) -> Self {
        Self {
            date: r.date,
            fgi_normalized: r.fgi_normalized,
            market_sentiment: r.market_sentiment,
        }
    }
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", get(get_prediction))
        .route("/stock_data", get(get_stock_data))
        .route("/latest_news", get(get_latest_news))
        .route("/past_predictions", get(get_past_predictions))
        .route("/fgi_data", get(get_fgi_data))
        .route("/fgi_tomorrow", get(get_fgi_tomorrow))
        .route("/past_recommendations", get(get_past_recommendations))
}

/// Latest recommendation with the forecast it was made from.
async fn get_prediction(State(state): State<AppState>) -> Result<Json<PredictionSummary>, AppError> {
    let rec = state.store.recommendations().latest()?;
    let mut forecasts = state.store.forecasts().load()?;
    let forecast = match forecasts.iter().position(|f| f.date == rec.date) {
        Some(i) => forecasts.swap_remove(i),
        None => state.store.forecasts().latest()?,
    };
    let forecast = Forecast::new(forecast, state.config.forecast_margin);

    Ok(Json(PredictionSummary {
        date: rec.date,
        predicted_price: forecast.record.predicted_price,
        prediction_range: forecast.range(),
        overall_market_sentiment: rec.market_sentiment,
        today_close: rec.today_close,
        fgi_score: rec.fgi_score,
        fgi_sentiment: rec.fgi_sentiment,
        recommendation: rec.action,
    }))
}

async fn get_stock_data(State(state): State<AppState>) -> Result<Json<Vec<PriceRecord>>, AppError> {
    Ok(Json(state.store.prices().load()?))
}

async fn get_latest_news(State(state): State<AppState>) -> Result<Json<Vec<Headline>>, AppError> {
    let mut scored = state.store.scored_news().load()?;
    scored.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let headlines = scored
        .into_iter()
        .take(LATEST_NEWS_COUNT)
        .map(|a| Headline {
            title: a.title,
            source: a.source,
            published_at: a.published_at,
            description: a.description,
            url: a.url,
            sentiment: a.sentiment,
        })
        .collect();

    Ok(Json(headlines))
}

/// Actual close next to the forecast made for that date, newest first.
async fn get_past_predictions(State(state): State<AppState>) -> Result<Json<Vec<PastPrediction>>, AppError> {
    let closes: BTreeMap<NaiveDate, f64> = state
        .store
        .prices()
        .load()?
        .into_iter()
        .map(|p| (p.date, p.close))
        .collect();
    let forecasts = state.store.forecasts().load()?;

    let mut joined: Vec<PastPrediction> = forecasts
        .into_iter()
        .filter_map(|f| {
            closes.get(&f.date).map(|&close| PastPrediction {
                date: f.date,
                close,
                predicted_price: f.predicted_price,
            })
        })
        .collect();
    joined.sort_by(|a, b| b.date.cmp(&a.date));
    joined.truncate(PAST_PREDICTION_COUNT);

    Ok(Json(joined))
}

/// The rows before tomorrow's synthetic row, oldest first.
async fn get_fgi_data(State(state): State<AppState>) -> Result<Json<Vec<FgiPoint>>, AppError> {
    let series = state.store.fgi().load()?;
    let history = &series[..series.len().saturating_sub(1)];
    let start = history.len().saturating_sub(PAST_FGI_COUNT);

    Ok(Json(history[start..].iter().map(FgiPoint::from).collect()))
}

async fn get_fgi_tomorrow(State(state): State<AppState>) -> Result<Json<FgiPoint>, AppError> {
    let tomorrow = state.store.fgi().latest()?;
    Ok(Json(FgiPoint::from(&tomorrow)))
}

/// Every recommendation except the most recent, newest first.
async fn get_past_recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let mut recs = state.store.recommendations().load()?;
    recs.sort_by(|a, b| b.date.cmp(&a.date));
    let past = recs.into_iter().skip(1).collect();
    Ok(Json(past))
}
