use std::path::{Path, PathBuf};

use crate::TradingCalendar;

/// Location of every CSV table the pipeline reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub stocks: String,
    pub fgi_input: String,
    pub interest_rate: String,
    pub gdp: String,
    pub inflation: String,
    pub news: String,
    pub news_sentiment: String,
    pub market_sentiment: String,
    pub fgi_output: String,
    pub predictions: String,
    pub recommendations: String,
}

impl DataPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stocks: "stocks_data.csv".to_string(),
            fgi_input: "fgi_data.csv".to_string(),
            interest_rate: "interest_rate_data.csv".to_string(),
            gdp: "gdp_data.csv".to_string(),
            inflation: "inflation_data.csv".to_string(),
            news: "news_data.csv".to_string(),
            news_sentiment: "news_sentiment_results.csv".to_string(),
            market_sentiment: "market_sentiment.csv".to_string(),
            fgi_output: "fgi_data_with_fgi.csv".to_string(),
            predictions: "predicted_prices.csv".to_string(),
            recommendations: "recommendations.csv".to_string(),
        }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stocks(&self) -> PathBuf {
        self.join(&self.stocks)
    }

    pub fn fgi_input(&self) -> PathBuf {
        self.join(&self.fgi_input)
    }

    pub fn interest_rate(&self) -> PathBuf {
        self.join(&self.interest_rate)
    }

    pub fn gdp(&self) -> PathBuf {
        self.join(&self.gdp)
    }

    pub fn inflation(&self) -> PathBuf {
        self.join(&self.inflation)
    }

    pub fn news(&self) -> PathBuf {
        self.join(&self.news)
    }

    pub fn news_sentiment(&self) -> PathBuf {
        self.join(&self.news_sentiment)
    }

    pub fn market_sentiment(&self) -> PathBuf {
        self.join(&self.market_sentiment)
    }

    pub fn fgi_output(&self) -> PathBuf {
        self.join(&self.fgi_output)
    }

    pub fn predictions(&self) -> PathBuf {
        self.join(&self.predictions)
    }

    pub fn recommendations(&self) -> PathBuf {
        self.join(&self.recommendations)
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new("./data")
    }
}

/// Which sentiment classifier backs the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    /// FinBERT served over HTTP
    Http,
    /// Offline financial word lists
    Lexicon,
}

impl ClassifierBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" | "finbert" => Some(ClassifierBackend::Http),
            "lexicon" | "wordlist" => Some(ClassifierBackend::Lexicon),
            _ => None,
        }
    }
}

/// Pipeline configuration shared by every component
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: DataPaths,
    pub ticker: String,
    pub news_query: String,
    pub news_max_articles: usize,
    pub macro_country: String,
    pub interest_rate_indicator: String,
    pub gdp_indicator: String,
    pub inflation_indicator: String,
    /// Trading days kept in the indicator input window
    pub price_window_days: usize,
    /// Calendar days searched when building the trading-day window
    pub calendar_lookback_days: i64,
    /// Closes fed to the sequence model
    pub sequence_length: usize,
    /// Symmetric uncertainty band around the forecast, in price units
    pub forecast_margin: f64,
    pub calendar: TradingCalendar,
    pub classifier: ClassifierBackend,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: DataPaths::default(),
            ticker: "I:NSEI".to_string(),
            news_query: "Nifty50 OR NSE OR Nifty".to_string(),
            news_max_articles: 500,
            macro_country: "IND".to_string(),
            interest_rate_indicator: "FR.INR.RINR".to_string(),
            gdp_indicator: "NY.GDP.MKTP.CD".to_string(),
            inflation_indicator: "FP.CPI.TOTL.ZG".to_string(),
            price_window_days: 261,
            calendar_lookback_days: 400,
            sequence_length: 60,
            forecast_margin: 200.0,
            calendar: TradingCalendar::default(),
            classifier: ClassifierBackend::Http,
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let calendar = std::env::var("MARKET_HOLIDAYS")
            .ok()
            .map(|list| TradingCalendar::from_list(&list))
            .unwrap_or(defaults.calendar);

        let classifier = std::env::var("SENTIMENT_BACKEND")
            .ok()
            .and_then(|v| ClassifierBackend::parse(&v))
            .unwrap_or(defaults.classifier);

        Self {
            paths: DataPaths::new(env_or("DATA_DIR", "./data".to_string())),
            ticker: env_or("MARKET_TICKER", defaults.ticker),
            news_query: env_or("NEWS_QUERY", defaults.news_query),
            news_max_articles: env_parse("NEWS_MAX_ARTICLES", defaults.news_max_articles),
            macro_country: env_or("MACRO_COUNTRY", defaults.macro_country),
            interest_rate_indicator: env_or("INTEREST_RATE_INDICATOR", defaults.interest_rate_indicator),
            gdp_indicator: env_or("GDP_INDICATOR", defaults.gdp_indicator),
            inflation_indicator: env_or("INFLATION_INDICATOR", defaults.inflation_indicator),
            price_window_days: env_parse("PRICE_WINDOW_DAYS", defaults.price_window_days),
            calendar_lookback_days: env_parse("CALENDAR_LOOKBACK_DAYS", defaults.calendar_lookback_days),
            sequence_length: env_parse("FORECAST_SEQUENCE_LENGTH", defaults.sequence_length),
            forecast_margin: env_parse("FORECAST_MARGIN", defaults.forecast_margin),
            calendar,
            classifier,
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths = DataPaths::new(dir);
        self
    }
}
