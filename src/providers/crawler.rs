//! Crawler provider trait.

use async_trait::async_trait;

use super::types::{PageRecord, ProviderError};

/// A crawling backend.
///
/// Implementations fetch and render pages however they like (headless
/// browser, HTTP spider, hosted API); the core only depends on the
/// [`PageRecord`] shape. Homepages are identified by normalized-URL
/// equality against the start URL.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Crawl a site breadth-first from `start_url`, up to `max_pages`.
    async fn crawl_site(
        &self,
        start_url: &str,
        max_pages: usize,
    ) -> Result<Vec<PageRecord>, ProviderError>;

    /// Fetch and render a single page. `None` when the page no longer
    /// exists.
    async fn crawl_page(&self, url: &str) -> Result<Option<PageRecord>, ProviderError>;

    /// Fast URL discovery (sitemap or equivalent) without fetching bodies.
    async fn map_site(&self, url: &str) -> Result<Vec<String>, ProviderError>;

    /// Scrape a known list of URLs.
    async fn batch_scrape(
        &self,
        urls: &[String],
        start_url: &str,
    ) -> Result<Vec<PageRecord>, ProviderError>;
}
