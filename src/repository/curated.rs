//! Curated state: site overview, sections, and per-page descriptions.
//!
//! These rows are the source of truth for artifact assembly; raw crawled
//! pages feed them but are never rendered directly.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::providers::{CuratedPageData, SectionData};
use crate::utils::normalize_url;

use super::models::{
    fmt_timestamp, parse_timestamp, CuratedPageRow, CuratedSectionRow, SiteOverviewRow,
};
use super::{RepoResult, Store};

fn row_to_curated_page(row: &sqlx::sqlite::SqliteRow) -> RepoResult<CuratedPageRow> {
    Ok(CuratedPageRow {
        id: row.get("id"),
        project_id: row.get("project_id"),
        url: row.get("url"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        content_hash: row.get("content_hash"),
        etag: row.get("etag"),
        last_modified_header: row.get("last_modified_header"),
        content_length: row.get("content_length"),
        sample_hash: row.get("sample_hash"),
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        updated_at: parse_timestamp(row.get::<String, _>("updated_at").as_str())?,
    })
}

fn row_to_section(row: &sqlx::sqlite::SqliteRow) -> RepoResult<CuratedSectionRow> {
    let page_urls: Vec<String> =
        serde_json::from_str(row.get::<String, _>("page_urls").as_str()).unwrap_or_default();
    Ok(CuratedSectionRow {
        id: row.get("id"),
        project_id: row.get("project_id"),
        name: row.get("name"),
        description: row.get("description"),
        page_urls,
        content_hash: row.get("content_hash"),
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        updated_at: parse_timestamp(row.get::<String, _>("updated_at").as_str())?,
    })
}

impl Store {
    // =========================================================================
    // Curated pages
    // =========================================================================

    pub async fn get_curated_pages(&self, project_id: &str) -> RepoResult<Vec<CuratedPageRow>> {
        let rows = sqlx::query("SELECT * FROM curated_pages WHERE project_id = ? ORDER BY url ASC")
            .bind(project_id)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(row_to_curated_page).collect()
    }

    /// Insert or update one curated page description.
    pub async fn upsert_curated_page(
        &self,
        project_id: &str,
        page: &CuratedPageData,
        content_hash: &str,
    ) -> RepoResult<()> {
        let now = fmt_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO curated_pages (id, project_id, url, title, description, category, \
             content_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id, url) DO UPDATE SET \
             title = excluded.title, description = excluded.description, \
             category = excluded.category, content_hash = excluded.content_hash, \
             updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(normalize_url(&page.url))
        .bind(&page.title)
        .bind(&page.description)
        .bind(&page.category)
        .bind(content_hash)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Delete curated pages by URL. Used when pages disappear from a site.
    pub async fn delete_curated_pages(&self, project_id: &str, urls: &[String]) -> RepoResult<u64> {
        let mut deleted = 0;
        let mut tx = self.pool().begin().await?;
        for url in urls {
            let result =
                sqlx::query("DELETE FROM curated_pages WHERE project_id = ? AND url = ?")
                    .bind(project_id)
                    .bind(normalize_url(url))
                    .execute(&mut *tx)
                    .await?;
            deleted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(deleted)
    }

    // =========================================================================
    // Curated sections
    // =========================================================================

    pub async fn get_curated_sections(&self, project_id: &str) -> RepoResult<Vec<CuratedSectionRow>> {
        let rows =
            sqlx::query("SELECT * FROM curated_sections WHERE project_id = ? ORDER BY created_at ASC, name ASC")
                .bind(project_id)
                .fetch_all(self.pool())
                .await?;
        rows.iter().map(row_to_section).collect()
    }

    /// Insert or update one section's prose, membership, and hash.
    pub async fn upsert_curated_section(
        &self,
        project_id: &str,
        name: &str,
        description: &str,
        page_urls: &[String],
        content_hash: &str,
    ) -> RepoResult<()> {
        let now = fmt_timestamp(Utc::now());
        let urls_json = serde_json::to_string(page_urls).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            "INSERT INTO curated_sections (id, project_id, name, description, page_urls, \
             content_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id, name) DO UPDATE SET \
             description = excluded.description, page_urls = excluded.page_urls, \
             content_hash = excluded.content_hash, updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(urls_json)
        .bind(content_hash)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_curated_section(&self, project_id: &str, name: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM curated_sections WHERE project_id = ? AND name = ?")
            .bind(project_id)
            .bind(name)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Site overview
    // =========================================================================

    pub async fn get_site_overview(&self, project_id: &str) -> RepoResult<Option<SiteOverviewRow>> {
        let row = sqlx::query("SELECT * FROM site_overviews WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|row| {
            Ok(SiteOverviewRow {
                id: row.get("id"),
                project_id: row.get("project_id"),
                site_title: row.get("site_title"),
                tagline: row.get("tagline"),
                overview: row.get("overview"),
                created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
                updated_at: parse_timestamp(row.get::<String, _>("updated_at").as_str())?,
            })
        })
        .transpose()
    }

    pub async fn upsert_site_overview(
        &self,
        project_id: &str,
        site_title: &str,
        tagline: &str,
        overview: &str,
    ) -> RepoResult<()> {
        let now = fmt_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO site_overviews (id, project_id, site_title, tagline, overview, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id) DO UPDATE SET \
             site_title = excluded.site_title, tagline = excluded.tagline, \
             overview = excluded.overview, updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(site_title)
        .bind(tagline)
        .bind(overview)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    // =========================================================================
    // Full replacement (full-regeneration path)
    // =========================================================================

    /// Replace the entire curated state in one transaction: overview,
    /// every section, every curated page. `page_hashes` maps normalized
    /// URL to the fresh content hash each description was written from.
    pub async fn replace_curated_state(
        &self,
        project_id: &str,
        site_title: &str,
        tagline: &str,
        overview: &str,
        sections: &[SectionData],
        page_hashes: &std::collections::HashMap<String, String>,
        section_hashes: &std::collections::HashMap<String, String>,
    ) -> RepoResult<()> {
        let now = fmt_timestamp(Utc::now());
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO site_overviews (id, project_id, site_title, tagline, overview, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id) DO UPDATE SET \
             site_title = excluded.site_title, tagline = excluded.tagline, \
             overview = excluded.overview, updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(site_title)
        .bind(tagline)
        .bind(overview)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM curated_sections WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM curated_pages WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        for section in sections {
            let page_urls: Vec<String> =
                section.pages.iter().map(|p| normalize_url(&p.url)).collect();
            let urls_json = serde_json::to_string(&page_urls).unwrap_or_else(|_| "[]".to_string());
            let section_hash = section_hashes
                .get(&section.name)
                .cloned()
                .unwrap_or_default();

            sqlx::query(
                "INSERT INTO curated_sections (id, project_id, name, description, page_urls, \
                 content_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(project_id)
            .bind(&section.name)
            .bind(&section.description)
            .bind(urls_json)
            .bind(section_hash)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            for page in &section.pages {
                let url = normalize_url(&page.url);
                let content_hash = page_hashes.get(&url).cloned().unwrap_or_default();
                sqlx::query(
                    "INSERT INTO curated_pages (id, project_id, url, title, description, \
                     category, content_hash, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT (project_id, url) DO UPDATE SET \
                     title = excluded.title, description = excluded.description, \
                     category = excluded.category, content_hash = excluded.content_hash, \
                     updated_at = excluded.updated_at",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(project_id)
                .bind(url)
                .bind(&page.title)
                .bind(&page.description)
                .bind(&section.name)
                .bind(content_hash)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
