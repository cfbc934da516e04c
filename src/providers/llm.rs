//! Language-model curator trait and boundary helpers.

use async_trait::async_trait;
use tracing::warn;

use super::types::{
    FullCuration, PageCategorization, PageChange, PageRecord, ProviderError, RelevanceVerdict,
    SectionOutcome, SignificanceVerdict, SiteContext,
};

/// The language-model capability the core depends on.
///
/// Each operation takes prompt-shaped inputs and returns parsed structures;
/// prompt text, model selection, and retry policy are implementation
/// concerns. Implementations are expected to run with deterministic
/// sampling, but callers never rely on byte-identical output, only on
/// structural validity.
#[async_trait]
pub trait LlmCurator: Send + Sync {
    /// Classify which of `pages` belong in the artifact.
    async fn filter_relevance(
        &self,
        pages: &[PageRecord],
    ) -> Result<RelevanceVerdict, ProviderError>;

    /// Judge which of the changed pages changed in meaning, not just form.
    async fn evaluate_semantic_significance(
        &self,
        changes: &[PageChange],
    ) -> Result<SignificanceVerdict, ProviderError>;

    /// Produce the full curated structure for a site.
    async fn curate_full(&self, pages: &[PageRecord]) -> Result<FullCuration, ProviderError>;

    /// Rewrite one section's prose given its current pages.
    async fn regenerate_section(
        &self,
        section_name: &str,
        pages: &[PageRecord],
        site_context: &SiteContext,
    ) -> Result<SectionOutcome, ProviderError>;

    /// Assign newly discovered pages to sections, possibly proposing new
    /// section names.
    async fn categorize_new_pages(
        &self,
        pages: &[PageRecord],
        site_context: &SiteContext,
        existing_sections: &[String],
    ) -> Result<PageCategorization, ProviderError>;
}

/// Parse a provider JSON response, stripping markdown code fences if the
/// model wrapped its output in one.
pub fn parse_json_response(raw: &str) -> Result<serde_json::Value, ProviderError> {
    let mut content = raw.trim();

    if let Some(stripped) = content.strip_prefix("```") {
        // Drop the fence line (which may carry a language tag) and the
        // closing fence.
        content = stripped
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or(stripped);
        content = content.strip_suffix("```").unwrap_or(content).trim_end();
    }

    serde_json::from_str(content).map_err(Into::into)
}

/// Filter `pages` down to the relevant set via batched provider calls.
///
/// The homepage is always preserved regardless of classification: it is
/// essential context for the artifact. A failed or malformed batch fails
/// open (every page in that batch is kept) so a flaky provider can only
/// over-include, never silently drop content.
pub async fn filter_relevant_pages(
    curator: &dyn LlmCurator,
    pages: &[PageRecord],
    batch_size: usize,
) -> Vec<PageRecord> {
    let homepage = pages.iter().find(|p| p.is_homepage).cloned();
    let rest: Vec<&PageRecord> = pages.iter().filter(|p| !p.is_homepage).collect();

    let mut kept: Vec<PageRecord> = Vec::new();
    if let Some(ref home) = homepage {
        kept.push(home.clone());
    }

    let batch_size = batch_size.max(1);
    for (batch_num, batch) in rest.chunks(batch_size).enumerate() {
        let owned: Vec<PageRecord> = batch.iter().map(|p| (*p).clone()).collect();
        match curator.filter_relevance(&owned).await {
            Ok(verdict) => {
                for page in batch {
                    if verdict.relevant_urls.iter().any(|u| u == &page.url) {
                        kept.push((*page).clone());
                    }
                }
            }
            Err(err) => {
                // Fail open: keep the whole batch.
                warn!(batch = batch_num, error = %err, "relevance batch failed, keeping all pages");
                kept.extend(batch.iter().map(|p| (*p).clone()));
            }
        }
    }

    kept
}
