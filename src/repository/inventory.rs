//! URL inventory: every URL ever observed on a site.
//!
//! Entries are never deleted. A URL that disappears from the site simply
//! stops having its `last_seen_at` touched, which is what the planner's
//! removal detection keys on.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::utils::normalize_url;

use super::models::{fmt_timestamp, parse_timestamp, InventoryDiff, InventoryEntry};
use super::{RepoResult, Store};

impl Store {
    /// Diff `urls` against the stored inventory and update it.
    ///
    /// New URLs are inserted with first/last-seen now; existing URLs get
    /// their `last_seen_at` touched; URLs absent from the input are
    /// reported as removed but left in place. One transaction.
    pub async fn store_inventory(
        &self,
        project_id: &str,
        urls: &[String],
    ) -> RepoResult<InventoryDiff> {
        let incoming: HashSet<String> = urls.iter().map(|u| normalize_url(u)).collect();

        let stored: HashSet<String> = self
            .get_inventory(project_id)
            .await?
            .into_iter()
            .map(|e| e.url)
            .collect();

        let mut diff = InventoryDiff::default();
        let now = fmt_timestamp(Utc::now());
        let mut tx = self.pool().begin().await?;

        for url in &incoming {
            if stored.contains(url) {
                sqlx::query(
                    "UPDATE site_url_inventory SET last_seen_at = ? \
                     WHERE project_id = ? AND url = ?",
                )
                .bind(&now)
                .bind(project_id)
                .bind(url)
                .execute(&mut *tx)
                .await?;
                diff.existing_urls.push(url.clone());
            } else {
                sqlx::query(
                    "INSERT INTO site_url_inventory (id, project_id, url, first_seen_at, last_seen_at) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(project_id)
                .bind(url)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
                diff.new_urls.push(url.clone());
            }
        }

        tx.commit().await?;

        diff.removed_urls = stored.difference(&incoming).cloned().collect();
        diff.total_stored = stored.len() + diff.new_urls.len();

        diff.new_urls.sort();
        diff.removed_urls.sort();
        diff.existing_urls.sort();
        Ok(diff)
    }

    pub async fn get_inventory(&self, project_id: &str) -> RepoResult<Vec<InventoryEntry>> {
        let rows = sqlx::query(
            "SELECT url, first_seen_at, last_seen_at FROM site_url_inventory \
             WHERE project_id = ? ORDER BY url ASC",
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(InventoryEntry {
                    url: row.get("url"),
                    first_seen_at: parse_timestamp(row.get::<String, _>("first_seen_at").as_str())?,
                    last_seen_at: parse_timestamp(row.get::<String, _>("last_seen_at").as_str())?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_initial_store_is_all_new() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        let diff = store
            .store_inventory(
                &project.id,
                &urls(&["https://example.com/a", "https://example.com/b"]),
            )
            .await
            .unwrap();

        assert_eq!(diff.new_urls.len(), 2);
        assert!(diff.removed_urls.is_empty());
        assert!(diff.existing_urls.is_empty());
        assert_eq!(diff.total_stored, 2);
    }

    #[tokio::test]
    async fn test_removed_urls_reported_but_kept() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        store
            .store_inventory(
                &project.id,
                &urls(&["https://example.com/a", "https://example.com/b"]),
            )
            .await
            .unwrap();

        let diff = store
            .store_inventory(
                &project.id,
                &urls(&["https://example.com/a", "https://example.com/c"]),
            )
            .await
            .unwrap();

        assert_eq!(diff.new_urls, vec!["https://example.com/c"]);
        assert_eq!(diff.removed_urls, vec!["https://example.com/b"]);
        assert_eq!(diff.existing_urls, vec!["https://example.com/a"]);

        // The removed URL is still in the inventory.
        let entries = store.get_inventory(&project.id).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_urls_are_normalized() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        store
            .store_inventory(&project.id, &urls(&["https://example.com/A/"]))
            .await
            .unwrap();
        let diff = store
            .store_inventory(&project.id, &urls(&["https://EXAMPLE.com/a"]))
            .await
            .unwrap();

        // Same URL under normalization: existing, not new.
        assert!(diff.new_urls.is_empty());
        assert_eq!(diff.existing_urls, vec!["https://example.com/a"]);
    }
}
