//! Relational store for projects, versioned pages, URL inventory, curated
//! state, artifacts, and crawl jobs.
//!
//! SQLite via sqlx. All multi-row updates run inside one transaction; the
//! per-project single-writer invariant upstream keeps writers for the same
//! project serialized, so `MAX(version) + 1` inside the writing transaction
//! is sufficient for monotonic versions.

mod artifacts;
mod curated;
mod inventory;
mod jobs;
mod models;
mod pages;
mod projects;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

pub use models::{
    ArtifactRow, ArtifactVersionRow, CrawlJobRow, CuratedPageRow, CuratedSectionRow,
    InventoryDiff, InventoryEntry, JobStatus, NewPage, PageRow, Project, ProjectStatus,
    SiteOverviewRow, TriggerReason,
};
pub use pages::FingerprintEntry;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid timestamp in row: {0}")]
    BadTimestamp(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id              TEXT PRIMARY KEY,
    url             TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending',
    created_at      TEXT NOT NULL,
    last_checked_at TEXT
);

CREATE TABLE IF NOT EXISTS pages (
    id                   TEXT PRIMARY KEY,
    project_id           TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    url                  TEXT NOT NULL,
    title                TEXT,
    description          TEXT,
    first_paragraph      TEXT,
    content_hash         TEXT,
    etag                 TEXT,
    last_modified_header TEXT,
    content_length       INTEGER,
    sample_hash          TEXT,
    version              INTEGER NOT NULL DEFAULT 1,
    depth                INTEGER NOT NULL DEFAULT 0,
    crawled_at           TEXT NOT NULL,
    UNIQUE (project_id, url, version)
);
CREATE INDEX IF NOT EXISTS idx_pages_project_version ON pages(project_id, version);

CREATE TABLE IF NOT EXISTS site_url_inventory (
    id            TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    url           TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    last_seen_at  TEXT NOT NULL,
    UNIQUE (project_id, url)
);

CREATE TABLE IF NOT EXISTS curated_pages (
    id                   TEXT PRIMARY KEY,
    project_id           TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    url                  TEXT NOT NULL,
    title                TEXT NOT NULL,
    description          TEXT NOT NULL,
    category             TEXT NOT NULL,
    content_hash         TEXT NOT NULL,
    etag                 TEXT,
    last_modified_header TEXT,
    content_length       INTEGER,
    sample_hash          TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    UNIQUE (project_id, url)
);

CREATE TABLE IF NOT EXISTS curated_sections (
    id           TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    description  TEXT NOT NULL,
    page_urls    TEXT NOT NULL DEFAULT '[]',
    content_hash TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (project_id, name)
);

CREATE TABLE IF NOT EXISTS site_overviews (
    id         TEXT PRIMARY KEY,
    project_id TEXT NOT NULL UNIQUE REFERENCES projects(id) ON DELETE CASCADE,
    site_title TEXT NOT NULL,
    tagline    TEXT NOT NULL,
    overview   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id           TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL UNIQUE REFERENCES projects(id) ON DELETE CASCADE,
    content      TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    generated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifact_versions (
    id             TEXT PRIMARY KEY,
    project_id     TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    version        INTEGER NOT NULL,
    content        TEXT NOT NULL,
    content_hash   TEXT NOT NULL,
    generated_at   TEXT NOT NULL,
    trigger_reason TEXT,
    UNIQUE (project_id, version)
);

CREATE TABLE IF NOT EXISTS crawl_jobs (
    id             TEXT PRIMARY KEY,
    project_id     TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    status         TEXT NOT NULL DEFAULT 'pending',
    trigger_reason TEXT NOT NULL DEFAULT 'initial',
    pages_crawled  INTEGER NOT NULL DEFAULT 0,
    pages_changed  INTEGER NOT NULL DEFAULT 0,
    error_message  TEXT,
    started_at     TEXT,
    completed_at   TEXT,
    created_at     TEXT NOT NULL,
    task_handle    TEXT
);
CREATE INDEX IF NOT EXISTS idx_crawl_jobs_project ON crawl_jobs(project_id, created_at);
"#;

/// Handle to the relational store. Cheap to clone; all methods borrow the
/// inner pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `url` and ensure the
    /// schema exists.
    pub async fn connect(url: &str) -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store for tests. Single connection: every pooled SQLite
    /// `:memory:` connection is otherwise a separate database.
    pub async fn memory() -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
