//! Product sources: the scraping capability the watchlist depends on.
//!
//! Scraping itself lives outside this crate. Implementors turn a canonical
//! product link into a [`Product`] and a free-text query into search results.

pub mod allowed_domains;
pub mod error;

use async_trait::async_trait;

use crate::model::Product;
use crate::model::Region;
use crate::source::error::SourceError;

/// A remote marketplace that can be scraped for product data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Fetches the current state of the product behind a canonical link.
    ///
    /// The returned product's `link` must be the link that was scraped.
    async fn scrape(&self, link: &str) -> Result<Product, SourceError>;

    /// Searches the marketplace of `region` for `query`.
    async fn search(&self, query: &str, region: &Region) -> Result<Vec<Product>, SourceError>;
}
