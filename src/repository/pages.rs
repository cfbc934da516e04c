//! Versioned page rows and fingerprint persistence.
//!
//! Pages are append-only across versions: version-N rows are never mutated
//! once version N+1 exists, except for fingerprint advancement on the
//! current version by the lightweight checker.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::probe::ObservedFingerprint;
use crate::utils::normalize_url;

use super::models::{fmt_timestamp, parse_timestamp, NewPage, PageRow};
use super::{RepoResult, Store};

/// The (etag, last_modified, content_hash) triple for quick lookups.
#[derive(Debug, Clone, Default)]
pub struct FingerprintEntry {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_hash: Option<String>,
}

fn row_to_page(row: &sqlx::sqlite::SqliteRow) -> RepoResult<PageRow> {
    Ok(PageRow {
        id: row.get("id"),
        project_id: row.get("project_id"),
        url: row.get("url"),
        title: row.get("title"),
        description: row.get("description"),
        first_paragraph: row.get("first_paragraph"),
        content_hash: row.get("content_hash"),
        etag: row.get("etag"),
        last_modified_header: row.get("last_modified_header"),
        content_length: row.get("content_length"),
        sample_hash: row.get("sample_hash"),
        version: row.get("version"),
        depth: row.get("depth"),
        crawled_at: parse_timestamp(row.get::<String, _>("crawled_at").as_str())?,
    })
}

impl Store {
    /// Highest page version for a project, 0 when never crawled.
    pub async fn max_page_version(&self, project_id: &str) -> RepoResult<i64> {
        let row = sqlx::query("SELECT COALESCE(MAX(version), 0) AS v FROM pages WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.get("v"))
    }

    /// Pages of a project at `version` (latest when `None`), ordered by URL.
    pub async fn get_pages(
        &self,
        project_id: &str,
        version: Option<i64>,
    ) -> RepoResult<Vec<PageRow>> {
        let version = match version {
            Some(v) => v,
            None => self.max_page_version(project_id).await?,
        };
        if version == 0 {
            return Ok(Vec::new());
        }

        let rows =
            sqlx::query("SELECT * FROM pages WHERE project_id = ? AND version = ? ORDER BY url ASC")
                .bind(project_id)
                .bind(version)
                .fetch_all(self.pool())
                .await?;
        rows.iter().map(row_to_page).collect()
    }

    /// Write one page row per entry at `version`, in a single transaction.
    /// URLs are normalized on the way in.
    pub async fn save_pages(
        &self,
        project_id: &str,
        version: i64,
        pages: &[NewPage],
    ) -> RepoResult<()> {
        let now = fmt_timestamp(Utc::now());
        let mut tx = self.pool().begin().await?;

        for page in pages {
            sqlx::query(
                "INSERT INTO pages (id, project_id, url, title, description, first_paragraph, \
                 content_hash, etag, last_modified_header, content_length, sample_hash, version, \
                 depth, crawled_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(project_id)
            .bind(normalize_url(&page.url))
            .bind(&page.title)
            .bind(&page.description)
            .bind(&page.first_paragraph)
            .bind(&page.content_hash)
            .bind(&page.etag)
            .bind(&page.last_modified_header)
            .bind(page.content_length)
            .bind(&page.sample_hash)
            .bind(version)
            .bind(page.depth)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// url → (etag, last_modified, content_hash) for the latest version.
    pub async fn fingerprint_map(
        &self,
        project_id: &str,
        version: Option<i64>,
    ) -> RepoResult<HashMap<String, FingerprintEntry>> {
        let pages = self.get_pages(project_id, version).await?;
        Ok(pages
            .into_iter()
            .map(|p| {
                (
                    p.url,
                    FingerprintEntry {
                        etag: p.etag,
                        last_modified: p.last_modified_header,
                        content_hash: p.content_hash,
                    },
                )
            })
            .collect())
    }

    /// Advance the stored identity headers for one page at `version`.
    ///
    /// Used by the lightweight checker for first observations and for
    /// changed-but-insignificant pages. The `first_paragraph` baseline is
    /// deliberately left alone so cumulative drift keeps accumulating.
    pub async fn update_page_fingerprint(
        &self,
        project_id: &str,
        url: &str,
        version: i64,
        observed: &ObservedFingerprint,
        sample_hash: Option<&str>,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE pages SET \
             etag = COALESCE(?, etag), \
             last_modified_header = COALESCE(?, last_modified_header), \
             content_length = COALESCE(?, content_length), \
             sample_hash = COALESCE(?, sample_hash) \
             WHERE project_id = ? AND url = ? AND version = ?",
        )
        .bind(&observed.etag)
        .bind(&observed.last_modified)
        .bind(observed.content_length)
        .bind(sample_hash)
        .bind(project_id)
        .bind(normalize_url(url))
        .bind(version)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, hash: &str) -> NewPage {
        NewPage {
            url: url.to_string(),
            title: Some("T".into()),
            content_hash: Some(hash.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_versions_are_isolated() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        store
            .save_pages(&project.id, 1, &[page("https://example.com/a", "h1")])
            .await
            .unwrap();
        store
            .save_pages(
                &project.id,
                2,
                &[
                    page("https://example.com/a", "h2"),
                    page("https://example.com/b", "h3"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.max_page_version(&project.id).await.unwrap(), 2);

        let latest = store.get_pages(&project.id, None).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest.iter().all(|p| p.version == 2));

        let v1 = store.get_pages(&project.id, Some(1)).await.unwrap();
        assert_eq!(v1.len(), 1);
        assert_eq!(v1[0].content_hash.as_deref(), Some("h1"));
    }

    #[tokio::test]
    async fn test_pages_ordered_by_url() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        store
            .save_pages(
                &project.id,
                1,
                &[
                    page("https://example.com/zebra", "h"),
                    page("https://example.com/alpha", "h"),
                ],
            )
            .await
            .unwrap();

        let pages = store.get_pages(&project.id, None).await.unwrap();
        assert_eq!(pages[0].url, "https://example.com/alpha");
        assert_eq!(pages[1].url, "https://example.com/zebra");
    }

    #[tokio::test]
    async fn test_fingerprint_update_leaves_baseline() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        let mut new_page = page("https://example.com/a", "h1");
        new_page.first_paragraph = Some("baseline text".into());
        store.save_pages(&project.id, 1, &[new_page]).await.unwrap();

        let observed = ObservedFingerprint {
            etag: Some("tag2".into()),
            last_modified: None,
            content_length: Some(42),
        };
        store
            .update_page_fingerprint(&project.id, "https://example.com/a", 1, &observed, None)
            .await
            .unwrap();

        let pages = store.get_pages(&project.id, None).await.unwrap();
        assert_eq!(pages[0].etag.as_deref(), Some("tag2"));
        assert_eq!(pages[0].content_length, Some(42));
        // Baseline preserved so drift keeps accumulating.
        assert_eq!(pages[0].first_paragraph.as_deref(), Some("baseline text"));
    }

    #[tokio::test]
    async fn test_fingerprint_map_shape() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        let mut p = page("https://example.com/a", "hash-a");
        p.etag = Some("e1".into());
        store.save_pages(&project.id, 1, &[p]).await.unwrap();

        let map = store.fingerprint_map(&project.id, None).await.unwrap();
        let entry = map.get("https://example.com/a").unwrap();
        assert_eq!(entry.etag.as_deref(), Some("e1"));
        assert_eq!(entry.content_hash.as_deref(), Some("hash-a"));
    }
}
