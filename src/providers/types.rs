//! Record and result types crossing the provider boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from provider calls.
///
/// `Misformat` covers structurally invalid responses (un-parseable JSON,
/// missing required fields); callers are expected to fall back to a safe
/// default rather than fail the surrounding task.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure reaching the provider.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status.
    #[error("provider returned status {status}: {message}")]
    Remote { status: u16, message: String },

    /// Provider output could not be parsed into the expected shape.
    #[error("provider response malformed: {0}")]
    Misformat(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Misformat(err.to_string())
    }
}

/// One crawled page as returned by the crawler provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Canonical page content, markdown-rendered by the provider.
    #[serde(default)]
    pub markdown: String,
    /// Hash of the canonical content, computed by the provider.
    pub content_hash: String,
    /// Semantic fingerprint for header-less origins, when available.
    #[serde(default)]
    pub sample_hash: Option<String>,
    #[serde(default)]
    pub is_homepage: bool,
    #[serde(default)]
    pub depth: u32,
}

/// Result of the batched relevance classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub relevant_urls: Vec<String>,
}

/// A changed page submitted for semantic significance evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct PageChange {
    pub url: String,
    /// The stored curated description, acting as "old".
    pub old_description: String,
    /// Prefix of the freshly crawled markdown, acting as "new".
    pub new_markdown_prefix: String,
}

/// Result of the batched semantic significance evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignificanceVerdict {
    pub significant_urls: Vec<String>,
    #[serde(default)]
    pub reasons: HashMap<String, String>,
}

/// A single curated page description destined for the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedPageData {
    pub url: String,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// A curated section with prose and member pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionData {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub pages: Vec<CuratedPageData>,
}

/// Result of full site curation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullCuration {
    pub site_title: String,
    pub tagline: String,
    pub overview: String,
    pub sections: Vec<SectionData>,
}

/// Result of categorizing newly discovered pages against existing sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCategorization {
    pub pages: Vec<CuratedPageData>,
    #[serde(default)]
    pub new_sections_needed: Vec<String>,
}

/// Site-level context handed to section-scoped provider calls.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub site_title: String,
    pub tagline: String,
}

/// What the provider decided for a regenerated section.
///
/// Modeled as a tagged variant so no free-form "action" string crosses the
/// provider boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// Keep the section with fresh prose.
    Keep { description: String },
    /// Remove the section; the provider saw no substantive content.
    Delete { reason: String },
}
