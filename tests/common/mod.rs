//! Shared fixtures: mock providers, settings, and a Redis availability
//! gate so scheduler-backed tests skip cleanly on machines without Redis.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use sitepulse::{
    Crawler, CuratedPageData, FullCuration, LlmCurator, PageCategorization, PageChange,
    PageRecord, ProviderError, RelevanceVerdict, SectionData, SectionOutcome, Settings,
    SignificanceVerdict, SiteContext,
};

/// Settings tuned for tests: tight timeouts, no politeness delay.
pub fn test_settings() -> Settings {
    Settings::builder()
        .request_timeout_secs(5)
        .lightweight_request_delay_ms(0)
        .build()
        .expect("test settings are valid")
}

/// Connect to Redis if one is reachable, otherwise `None` (test skips).
pub async fn try_redis() -> Option<redis::aio::ConnectionManager> {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());
    let client = redis::Client::open(url).ok()?;
    match tokio::time::timeout(
        Duration::from_secs(2),
        redis::aio::ConnectionManager::new(client),
    )
    .await
    {
        Ok(Ok(conn)) => Some(conn),
        _ => None,
    }
}

/// Unique key namespace per test run, so parallel tests never collide.
pub fn test_namespace() -> String {
    format!("sitepulse-test-{}", uuid_like())
}

fn uuid_like() -> String {
    // Avoid pulling uuid into dev scope just for this.
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    format!("{nanos:x}")
}

pub fn record(url: &str, hash: &str) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        title: format!("Title of {url}"),
        description: Some("A page".to_string()),
        markdown: format!("# Heading\n\nContent of {url}."),
        content_hash: hash.to_string(),
        sample_hash: None,
        is_homepage: false,
        depth: 1,
    }
}

pub fn homepage(url: &str, hash: &str) -> PageRecord {
    PageRecord {
        is_homepage: true,
        depth: 0,
        ..record(url, hash)
    }
}

/// Crawler returning canned pages and map results.
pub struct MockCrawler {
    pub pages: Vec<PageRecord>,
    pub mapped: Vec<String>,
}

impl MockCrawler {
    pub fn new(pages: Vec<PageRecord>) -> Self {
        let mapped = pages.iter().map(|p| p.url.clone()).collect();
        Self { pages, mapped }
    }

    pub fn with_map(mut self, mapped: Vec<String>) -> Self {
        self.mapped = mapped;
        self
    }
}

#[async_trait]
impl Crawler for MockCrawler {
    async fn crawl_site(
        &self,
        _start_url: &str,
        _max_pages: usize,
    ) -> Result<Vec<PageRecord>, ProviderError> {
        Ok(self.pages.clone())
    }

    async fn crawl_page(&self, url: &str) -> Result<Option<PageRecord>, ProviderError> {
        Ok(self.pages.iter().find(|p| p.url == url).cloned())
    }

    async fn map_site(&self, _url: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.mapped.clone())
    }

    async fn batch_scrape(
        &self,
        urls: &[String],
        _start_url: &str,
    ) -> Result<Vec<PageRecord>, ProviderError> {
        Ok(self
            .pages
            .iter()
            .filter(|p| urls.contains(&p.url))
            .cloned()
            .collect())
    }
}

/// Curator with scripted verdicts. Records which sections it was asked to
/// regenerate so tests can assert selectivity.
pub struct MockCurator {
    /// Explicit relevance verdict; `None` means everything is relevant.
    pub relevant: Option<Vec<String>>,
    /// When set, relevance calls fail with a malformed-response error.
    pub fail_relevance: bool,
    /// URLs judged semantically significant.
    pub significant: Vec<String>,
    /// Canned full-curation result.
    pub curation: FullCuration,
    /// Categorization returned for new pages.
    pub categorization: PageCategorization,
    /// Per-section regeneration outcomes; default is fresh prose.
    pub section_outcomes: HashMap<String, SectionOutcome>,
    /// Section names regenerate was called for.
    pub regenerated: Mutex<Vec<String>>,
}

impl MockCurator {
    pub fn new() -> Self {
        Self {
            relevant: None,
            fail_relevance: false,
            significant: Vec::new(),
            curation: FullCuration {
                site_title: "Example".to_string(),
                tagline: "An example site".to_string(),
                overview: "Example does things.".to_string(),
                sections: Vec::new(),
            },
            categorization: PageCategorization::default(),
            section_outcomes: HashMap::new(),
            regenerated: Mutex::new(Vec::new()),
        }
    }

    pub fn with_relevant(mut self, urls: &[&str]) -> Self {
        self.relevant = Some(urls.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_failing_relevance(mut self) -> Self {
        self.fail_relevance = true;
        self
    }

    pub fn with_significant(mut self, urls: &[&str]) -> Self {
        self.significant = urls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_curation(mut self, sections: Vec<SectionData>) -> Self {
        self.curation.sections = sections;
        self
    }
}

#[async_trait]
impl LlmCurator for MockCurator {
    async fn filter_relevance(
        &self,
        pages: &[PageRecord],
    ) -> Result<RelevanceVerdict, ProviderError> {
        if self.fail_relevance {
            return Err(ProviderError::Misformat("scripted failure".to_string()));
        }
        Ok(RelevanceVerdict {
            relevant_urls: match &self.relevant {
                Some(urls) => pages
                    .iter()
                    .filter(|p| urls.contains(&p.url))
                    .map(|p| p.url.clone())
                    .collect(),
                None => pages.iter().map(|p| p.url.clone()).collect(),
            },
        })
    }

    async fn evaluate_semantic_significance(
        &self,
        changes: &[PageChange],
    ) -> Result<SignificanceVerdict, ProviderError> {
        Ok(SignificanceVerdict {
            significant_urls: changes
                .iter()
                .filter(|c| self.significant.contains(&c.url))
                .map(|c| c.url.clone())
                .collect(),
            reasons: HashMap::new(),
        })
    }

    async fn curate_full(&self, _pages: &[PageRecord]) -> Result<FullCuration, ProviderError> {
        Ok(self.curation.clone())
    }

    async fn regenerate_section(
        &self,
        section_name: &str,
        _pages: &[PageRecord],
        _site_context: &SiteContext,
    ) -> Result<SectionOutcome, ProviderError> {
        self.regenerated
            .lock()
            .expect("mutex poisoned")
            .push(section_name.to_string());
        Ok(self
            .section_outcomes
            .get(section_name)
            .cloned()
            .unwrap_or(SectionOutcome::Keep {
                description: format!("Fresh prose for {section_name}."),
            }))
    }

    async fn categorize_new_pages(
        &self,
        _pages: &[PageRecord],
        _site_context: &SiteContext,
        _existing_sections: &[String],
    ) -> Result<PageCategorization, ProviderError> {
        Ok(self.categorization.clone())
    }
}

/// Convenience for building section data in fixtures.
pub fn section_data(name: &str, pages: &[(&str, &str)]) -> SectionData {
    SectionData {
        name: name.to_string(),
        description: format!("{name} prose."),
        pages: pages
            .iter()
            .map(|(url, title)| CuratedPageData {
                url: url.to_string(),
                title: title.to_string(),
                description: format!("Description of {title}"),
                category: name.to_string(),
            })
            .collect(),
    }
}
