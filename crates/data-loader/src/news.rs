use analysis_core::{AnalysisError, NewsArticle, NewsSource};
use market_store::{dedup_keep_last, MarketStore};
use std::sync::Arc;

/// Replaces the news cache with the latest batch from the provider.
pub struct NewsFetcher {
    source: Arc<dyn NewsSource>,
    store: MarketStore,
    query: String,
    max_articles: usize,
}

impl NewsFetcher {
    pub fn new(
        source: Arc<dyn NewsSource>,
        store: MarketStore,
        query: impl Into<String>,
        max_articles: usize,
    ) -> Self {
        Self {
            source,
            store,
            query: query.into(),
            max_articles,
        }
    }

    /// Returns the number of cached articles, or 0 when the provider had
    /// nothing and the previous cache was kept.
    pub async fn run(&self) -> Result<usize, AnalysisError> {
        let articles = self
            .source
            .latest_articles(&self.query, self.max_articles)
            .await?;

        let mut articles: Vec<NewsArticle> = dedup_keep_last(
            articles
                .into_iter()
                .filter(|a| !a.url.trim().is_empty())
                .collect(),
        );
        if articles.is_empty() {
            tracing::warn!("No articles for '{}', keeping the previous news cache", self.query);
            return Ok(0);
        }

        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles.truncate(self.max_articles);
        self.store.news().replace_all(&articles)?;

        tracing::info!("Cached {} articles for '{}'", articles.len(), self.query);
        Ok(articles.len())
    }
}
