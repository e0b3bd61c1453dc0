use analysis_core::{AnalysisError, MarketDataSource, NewsArticle, NewsSource, PriceRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Articles requested per news page.
const NEWS_PAGE_SIZE: usize = 100;
const MAX_NEWS_PAGES: usize = 20;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let oldest = match ts.front() {
                Some(&front) => front,
                None => continue,
            };
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Polygon.io REST client for daily index bars and news.
#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
    retry_wait: Duration,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        // Free tier users should set POLYGON_RATE_LIMIT=5.
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            retry_wait: Duration::from_secs(15),
        }
    }

    /// Reads `POLYGON_API_KEY`. An empty key still builds a client; requests
    /// will then fail with an API error and the fetch step is skipped.
    pub fn from_env() -> Self {
        let api_key = std::env::var("POLYGON_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("POLYGON_API_KEY not set, market and news fetches will fail");
        }
        Self::new(api_key)
    }

    /// Point the client at another host (used for tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            tracing::warn!(
                "Polygon 429 rate limited, waiting {}s before retry {}/3",
                self.retry_wait.as_secs(),
                attempt + 1
            );
            tokio::time::sleep(self.retry_wait).await;
        }

        Err(AnalysisError::ApiError("Rate limited by Polygon after 3 retries".to_string()))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AnalysisError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(AnalysisError::ApiError(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )))
    }

    /// Daily bars for `ticker` between `from` and `to` inclusive, oldest first.
    pub async fn get_daily_bars(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceRecord>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            ticker,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ])
        ).await?;
        let response = Self::check_status(response).await?;

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let mut bars: Vec<PriceRecord> = agg_response
            .results
            .into_iter()
            .filter_map(|r| {
                let date = DateTime::from_timestamp_millis(r.t)?.date_naive();
                Some(PriceRecord {
                    date,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v.unwrap_or(0.0),
                })
            })
            .collect();
        bars.sort_by_key(|b| b.date);

        tracing::debug!("Polygon returned {} daily bars for {}", bars.len(), ticker);
        Ok(bars)
    }

    /// Recent news, newest first, following Polygon's pagination cursor.
    ///
    /// `query` is an `OR`-separated keyword list matched case-insensitively
    /// against title and description; an empty query keeps every article.
    /// Articles are de-duplicated by URL and at most `max_articles` are returned.
    pub async fn get_news(&self, query: &str, max_articles: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        let keywords = parse_keywords(query);
        let mut articles = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut cursor: Option<String> = None;
        let page_limit = NEWS_PAGE_SIZE.to_string();

        for _ in 0..MAX_NEWS_PAGES {
            let mut builder = self.client.get(format!("{}/v2/reference/news", self.base_url))
                .query(&[
                    ("apiKey", self.api_key.as_str()),
                    ("limit", page_limit.as_str()),
                    ("order", "desc"),
                    ("sort", "published_utc"),
                ]);

            if let Some(ref c) = cursor {
                builder = builder.query(&[("cursor", c.as_str())]);
            }

            let response = self.send_request(builder).await?;
            let response = Self::check_status(response).await?;

            let body: NewsResponse = response
                .json()
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if body.results.is_empty() {
                break;
            }

            for r in body.results {
                let Some(article) = r.into_article() else {
                    continue;
                };
                if !matches_keywords(&article, &keywords) {
                    continue;
                }
                if seen_urls.insert(article.url.clone()) {
                    articles.push(article);
                }
                if articles.len() >= max_articles {
                    break;
                }
            }

            if articles.len() >= max_articles {
                break;
            }

            cursor = body.next_url.as_deref().and_then(extract_cursor);
            if cursor.is_none() {
                break;
            }
        }

        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(articles)
    }
}

#[async_trait]
impl MarketDataSource for PolygonClient {
    async fn daily_bars(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceRecord>, AnalysisError> {
        self.get_daily_bars(ticker, from, to).await
    }
}

#[async_trait]
impl NewsSource for PolygonClient {
    async fn latest_articles(
        &self,
        query: &str,
        max_articles: usize,
    ) -> Result<Vec<NewsArticle>, AnalysisError> {
        self.get_news(query, max_articles).await
    }
}

fn parse_keywords(query: &str) -> Vec<String> {
    query
        .split(" OR ")
        .map(|k| k.trim().trim_start_matches('#').to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn matches_keywords(article: &NewsArticle, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let text = article.classification_text().to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

/// Pull the decoded `cursor` parameter out of a `next_url`. The value goes
/// back through `.query()`, which encodes it again.
fn extract_cursor(next_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(next_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "cursor")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp (ms)
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    #[serde(default)]
    v: Option<f64>, // volume, absent for indices
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    title: String,
    published_utc: String,
    article_url: Option<String>,
    description: Option<String>,
    publisher: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
}

impl NewsResult {
    /// `None` for articles without a URL or with an unparseable timestamp.
    fn into_article(self) -> Option<NewsArticle> {
        let url = self.article_url.filter(|u| !u.trim().is_empty())?;
        let published_at = DateTime::parse_from_rfc3339(&self.published_utc)
            .ok()?
            .with_timezone(&Utc);

        Some(NewsArticle {
            title: self.title,
            source: self.publisher.and_then(|p| p.name).unwrap_or_default(),
            published_at,
            description: self.description.filter(|d| !d.trim().is_empty()),
            url,
        })
    }
}
