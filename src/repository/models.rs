//! Row types and status enums for the relational store.
//!
//! Children of a project carry a plain `project_id`; the aggregate is
//! navigated through the store, never through in-memory back-pointers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::StoredFingerprint;

use super::RepositoryError;

/// Lifecycle status of a tracked project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Crawling,
    Ready,
    Failed,
}

impl ProjectStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling => "crawling",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "crawling" => Self::Crawling,
            "ready" => Self::Ready,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Status of a crawl job. Immutable once completed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// What caused a crawl job or artifact version to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Initial,
    Manual,
    ScheduledCheck,
    LightweightChangeDetected,
    ChangeDetected,
}

impl TriggerReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Manual => "manual",
            Self::ScheduledCheck => "scheduled_check",
            Self::LightweightChangeDetected => "lightweight_change_detected",
            Self::ChangeDetected => "change_detected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "manual" => Self::Manual,
            "scheduled_check" => Self::ScheduledCheck,
            "lightweight_change_detected" => Self::LightweightChangeDetected,
            "change_detected" => Self::ChangeDetected,
            _ => Self::Initial,
        }
    }
}

/// A tracked website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Canonical URL: normalized, unique across projects.
    pub url: String,
    pub name: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// A crawled page at a specific version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRow {
    pub id: String,
    pub project_id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Truncated content preview kept as the drift baseline. Deliberately
    /// not advanced on insignificant changes so drift accumulates.
    pub first_paragraph: Option<String>,
    pub content_hash: Option<String>,
    pub etag: Option<String>,
    pub last_modified_header: Option<String>,
    pub content_length: Option<i64>,
    pub sample_hash: Option<String>,
    pub version: i64,
    pub depth: i64,
    pub crawled_at: DateTime<Utc>,
}

impl PageRow {
    /// The stored fingerprint quadruple for the probe.
    #[must_use]
    pub fn fingerprint(&self) -> StoredFingerprint {
        StoredFingerprint {
            etag: self.etag.clone(),
            last_modified: self.last_modified_header.clone(),
            content_length: self.content_length,
            sample_hash: self.sample_hash.clone(),
        }
    }
}

/// Input for writing a page row at a new version.
#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub first_paragraph: Option<String>,
    pub content_hash: Option<String>,
    pub etag: Option<String>,
    pub last_modified_header: Option<String>,
    pub content_length: Option<i64>,
    pub sample_hash: Option<String>,
    pub depth: i64,
}

/// One URL ever observed on a site. Entries are never deleted;
/// disappearance shows as a stale `last_seen_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub url: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Result of diffing a fresh URL set against the stored inventory.
#[derive(Debug, Clone, Default)]
pub struct InventoryDiff {
    pub new_urls: Vec<String>,
    pub removed_urls: Vec<String>,
    pub existing_urls: Vec<String>,
    pub total_stored: usize,
}

/// A stored, LLM-written page description destined for the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedPageRow {
    pub id: String,
    pub project_id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Hash of the content this description was written from; mismatch
    /// against a fresh crawl is the drift signal.
    pub content_hash: String,
    pub etag: Option<String>,
    pub last_modified_header: Option<String>,
    pub content_length: Option<i64>,
    pub sample_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A curated section: prose plus member page URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedSectionRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub page_urls: Vec<String>,
    /// Aggregate hash over member-page content hashes.
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Site-level overview content. One per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOverviewRow {
    pub id: String,
    pub project_id: String,
    pub site_title: String,
    pub tagline: String,
    pub overview: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The current artifact for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
}

/// A historical artifact version. `(project_id, version)` unique, versions
/// strictly monotonic per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactVersionRow {
    pub id: String,
    pub project_id: String,
    pub version: i64,
    pub content: String,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
    pub trigger_reason: Option<TriggerReason>,
}

/// One crawl operation, for audit and conflict gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJobRow {
    pub id: String,
    pub project_id: String,
    pub status: JobStatus,
    pub trigger_reason: TriggerReason,
    pub pages_crawled: i64,
    pub pages_changed: i64,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Executor-assigned handle for status tracking, when available.
    pub task_handle: Option<String>,
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RepositoryError::BadTimestamp(raw.to_string()))
}

pub(crate) fn parse_opt_timestamp(
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|s| parse_timestamp(&s)).transpose()
}

pub(crate) fn fmt_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}
