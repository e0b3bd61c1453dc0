//! data-loader: refresh the cached market, news and macro tables.
//!
//! Each fetcher pulls from a source trait object, normalizes the payload and
//! merges it into the on-disk history. Callers decide what to do with a
//! failed fetch; the tables are only written once a usable payload arrived.

pub mod macro_data;
pub mod market;
pub mod news;

pub use macro_data::MacroFetcher;
pub use market::MarketFetcher;
pub use news::NewsFetcher;
