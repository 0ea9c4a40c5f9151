//! Restricts a [`ProductSource`] to a configured set of hosts.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::model::Product;
use crate::model::Region;
use crate::source::ProductSource;
use crate::source::error::SourceError;

/// Wraps a source so that only links on allowed hosts are scraped, and only
/// results on allowed hosts are returned from searches.
///
/// An empty host list allows every host.
pub struct AllowedDomains {
    inner: Arc<dyn ProductSource>,
    hosts: Vec<String>,
}

impl AllowedDomains {
    pub fn new(inner: Arc<dyn ProductSource>, hosts: &[String]) -> Self {
        let hosts = hosts
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { inner, hosts }
    }

    pub fn is_allowed(&self, link: &str) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        url::Url::parse(link)
            .ok()
            .and_then(|url| url.host_str().map(str::to_lowercase))
            .is_some_and(|host| self.hosts.contains(&host))
    }
}

#[async_trait]
impl ProductSource for AllowedDomains {
    async fn scrape(&self, link: &str) -> Result<Product, SourceError> {
        if !self.is_allowed(link) {
            return Err(SourceError::UnsupportedDomain {
                link: link.to_string(),
            });
        }
        self.inner.scrape(link).await
    }

    async fn search(&self, query: &str, region: &Region) -> Result<Vec<Product>, SourceError> {
        let products = self.inner.search(query, region).await?;
        let total = products.len();
        let allowed: Vec<Product> = products
            .into_iter()
            .filter(|p| self.is_allowed(&p.link))
            .collect();
        if allowed.len() < total {
            debug!(
                "Dropped {} search results outside the allowed domains.",
                total - allowed.len()
            );
        }
        Ok(allowed)
    }
}
