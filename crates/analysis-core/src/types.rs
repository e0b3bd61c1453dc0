use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::Keyed;

/// Daily OHLCV bar for the tracked index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
}

/// One year of a macroeconomic series as returned by an indicator provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

/// Yearly macro indicator rows. Each indicator has its own CSV column name,
/// so each gets its own record type sharing this interface.
pub trait YearlyIndicator: Keyed<Key = i32> {
    fn from_year_value(year: i32, value: f64) -> Self;
    fn year(&self) -> i32;
    fn value(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Interest_Rate")]
    pub interest_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdpRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "GDP")]
    pub gdp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflationRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Inflation_Rate")]
    pub inflation_rate: f64,
}

impl YearlyIndicator for InterestRateRecord {
    fn from_year_value(year: i32, value: f64) -> Self {
        Self { year, interest_rate: value }
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn value(&self) -> f64 {
        self.interest_rate
    }
}

impl YearlyIndicator for GdpRecord {
    fn from_year_value(year: i32, value: f64) -> Self {
        Self { year, gdp: value }
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn value(&self) -> f64 {
        self.gdp
    }
}

impl YearlyIndicator for InflationRecord {
    fn from_year_value(year: i32, value: f64) -> Self {
        Self { year, inflation_rate: value }
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn value(&self) -> f64 {
        self.inflation_rate
    }
}

/// News article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub url: String,
}

impl NewsArticle {
    /// Text handed to the sentiment classifier: title followed by description.
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or(""))
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }

    /// Parse a classifier label. Accepts any casing.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            "positive" => Some(SentimentLabel::Positive),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A news article together with its classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub title: String,
    pub source: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "Sentiment")]
    pub sentiment: SentimentLabel,
    #[serde(rename = "Sentiment_Score")]
    pub sentiment_score: f64,
}

impl ScoredArticle {
    pub fn new(article: NewsArticle, sentiment: SentimentLabel, sentiment_score: f64) -> Self {
        Self {
            title: article.title,
            source: article.source,
            published_at: article.published_at,
            description: article.description,
            url: article.url,
            sentiment,
            sentiment_score,
        }
    }
}

/// Daily aggregate of article sentiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Overall_Sentiment")]
    pub overall_sentiment: SentimentLabel,
    #[serde(rename = "Sentiment_Score")]
    pub sentiment_score: f64,
    #[serde(rename = "Negative_Count")]
    pub negative_count: u32,
    #[serde(rename = "Neutral_Count")]
    pub neutral_count: u32,
    #[serde(rename = "Positive_Count")]
    pub positive_count: u32,
}

/// Fear & Greed band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FgiBand {
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
    #[serde(rename = "Greed")]
    Greed,
    #[serde(rename = "Fear")]
    Fear,
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
}

impl FgiBand {
    pub fn from_score(normalized: f64) -> Self {
        match normalized {
            s if s >= 75.0 => FgiBand::ExtremeGreed,
            s if s >= 50.0 => FgiBand::Greed,
            s if s >= 25.0 => FgiBand::Fear,
            _ => FgiBand::ExtremeFear,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            FgiBand::ExtremeGreed => "Extreme Greed",
            FgiBand::Greed => "Greed",
            FgiBand::Fear => "Fear",
            FgiBand::ExtremeFear => "Extreme Fear",
        }
    }
}

impl fmt::Display for FgiBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

/// One row of the annotated FGI series. Indicator columns are empty until
/// their lookback window is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FgiRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "SMA_50")]
    pub sma_50: Option<f64>,
    #[serde(rename = "SMA_200")]
    pub sma_200: Option<f64>,
    #[serde(rename = "EMA_50")]
    pub ema_50: Option<f64>,
    #[serde(rename = "EMA_200")]
    pub ema_200: Option<f64>,
    #[serde(rename = "True_Range")]
    pub true_range: Option<f64>,
    #[serde(rename = "ATR_14")]
    pub atr_14: Option<f64>,
    #[serde(rename = "RSI_14")]
    pub rsi_14: Option<f64>,
    #[serde(rename = "Interest_Rate")]
    pub interest_rate: f64,
    #[serde(rename = "FGI_Score")]
    pub fgi_score: i32,
    #[serde(rename = "FGI_Normalized")]
    pub fgi_normalized: f64,
    #[serde(rename = "Market_Sentiment")]
    pub market_sentiment: FgiBand,
}

/// Next-day closing price forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Predicted_Price")]
    pub predicted_price: f64,
}

/// Trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl Action {
    /// Numeric ordering from most bearish (-2) to most bullish (2)
    pub fn to_score(&self) -> i32 {
        match self {
            Action::StrongBuy => 2,
            Action::Buy => 1,
            Action::Hold => 0,
            Action::Sell => -1,
            Action::StrongSell => -2,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Action::StrongBuy => "STRONG BUY",
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
            Action::StrongSell => "STRONG SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Today_Close")]
    pub today_close: f64,
    #[serde(rename = "Predicted_Close")]
    pub predicted_close: f64,
    #[serde(rename = "Market_Sentiment")]
    pub market_sentiment: SentimentLabel,
    #[serde(rename = "FGI_Score")]
    pub fgi_score: f64,
    #[serde(rename = "FGI_Sentiment")]
    pub fgi_sentiment: FgiBand,
    #[serde(rename = "Recommendation")]
    pub action: Action,
}

impl Keyed for PriceRecord {
    type Key = NaiveDate;
    fn key(&self) -> NaiveDate {
        self.date
    }
}

impl Keyed for InterestRateRecord {
    type Key = i32;
    fn key(&self) -> i32 {
        self.year
    }
}

impl Keyed for GdpRecord {
    type Key = i32;
    fn key(&self) -> i32 {
        self.year
    }
}

impl Keyed for InflationRecord {
    type Key = i32;
    fn key(&self) -> i32 {
        self.year
    }
}

impl Keyed for NewsArticle {
    type Key = String;
    fn key(&self) -> String {
        self.url.clone()
    }
}

impl Keyed for ScoredArticle {
    type Key = String;
    fn key(&self) -> String {
        self.url.clone()
    }
}

impl Keyed for SentimentRecord {
    type Key = NaiveDate;
    fn key(&self) -> NaiveDate {
        self.date
    }
}

impl Keyed for FgiRecord {
    type Key = NaiveDate;
    fn key(&self) -> NaiveDate {
        self.date
    }
}

impl Keyed for ForecastRecord {
    type Key = NaiveDate;
    fn key(&self) -> NaiveDate {
        self.date
    }
}

impl Keyed for Recommendation {
    type Key = NaiveDate;
    fn key(&self) -> NaiveDate {
        self.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fgi_band_boundaries() {
        assert_eq!(FgiBand::from_score(100.0), FgiBand::ExtremeGreed);
        assert_eq!(FgiBand::from_score(75.0), FgiBand::ExtremeGreed);
        assert_eq!(FgiBand::from_score(74.99), FgiBand::Greed);
        assert_eq!(FgiBand::from_score(50.0), FgiBand::Greed);
        assert_eq!(FgiBand::from_score(25.0), FgiBand::Fear);
        assert_eq!(FgiBand::from_score(24.9), FgiBand::ExtremeFear);
        assert_eq!(FgiBand::from_score(0.0), FgiBand::ExtremeFear);
    }

    #[test]
    fn test_sentiment_label_parse() {
        assert_eq!(SentimentLabel::parse("Positive"), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse(" negative "), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::parse("bullish"), None);
    }

    #[test]
    fn test_classification_text_without_description() {
        let article = NewsArticle {
            title: "Nifty closes higher".to_string(),
            source: "Wire".to_string(),
            published_at: Utc::now(),
            description: None,
            url: "https://example.com/a".to_string(),
        };
        assert_eq!(article.classification_text(), "Nifty closes higher");
    }

    #[test]
    fn test_action_labels_match_wire_format() {
        assert_eq!(Action::StrongBuy.to_label(), "STRONG BUY");
        assert_eq!(Action::StrongSell.to_string(), "STRONG SELL");
        assert!(Action::Buy.to_score() > Action::Sell.to_score());
    }
}
