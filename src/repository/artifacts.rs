//! Current artifact and its version history.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::models::{fmt_timestamp, parse_timestamp, ArtifactRow, ArtifactVersionRow, TriggerReason};
use super::{RepoResult, Store};

fn row_to_version(row: &sqlx::sqlite::SqliteRow) -> RepoResult<ArtifactVersionRow> {
    Ok(ArtifactVersionRow {
        id: row.get("id"),
        project_id: row.get("project_id"),
        version: row.get("version"),
        content: row.get("content"),
        content_hash: row.get("content_hash"),
        generated_at: parse_timestamp(row.get::<String, _>("generated_at").as_str())?,
        trigger_reason: row
            .get::<Option<String>, _>("trigger_reason")
            .map(|s| TriggerReason::parse(&s)),
    })
}

impl Store {
    /// The current artifact for a project, if one exists.
    pub async fn get_artifact(&self, project_id: &str) -> RepoResult<Option<ArtifactRow>> {
        let row = sqlx::query("SELECT * FROM artifacts WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|row| {
            Ok(ArtifactRow {
                id: row.get("id"),
                project_id: row.get("project_id"),
                content: row.get("content"),
                content_hash: row.get("content_hash"),
                generated_at: parse_timestamp(row.get::<String, _>("generated_at").as_str())?,
            })
        })
        .transpose()
    }

    /// Write a new artifact version and upsert the current row.
    ///
    /// The version number is `MAX(version) + 1` computed inside the same
    /// transaction that inserts the row; combined with the per-project
    /// single-writer invariant this keeps versions strictly monotonic with
    /// no gaps. Returns the new version number.
    pub async fn save_artifact(
        &self,
        project_id: &str,
        content: &str,
        content_hash: &str,
        trigger_reason: TriggerReason,
    ) -> RepoResult<i64> {
        let now = fmt_timestamp(Utc::now());
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            "SELECT COALESCE(MAX(version), 0) AS v FROM artifact_versions WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_one(&mut *tx)
        .await?;
        let new_version: i64 = row.get::<i64, _>("v") + 1;

        sqlx::query(
            "INSERT INTO artifact_versions (id, project_id, version, content, content_hash, \
             generated_at, trigger_reason) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(new_version)
        .bind(content)
        .bind(content_hash)
        .bind(&now)
        .bind(trigger_reason.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO artifacts (id, project_id, content, content_hash, generated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (project_id) DO UPDATE SET \
             content = excluded.content, content_hash = excluded.content_hash, \
             generated_at = excluded.generated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(content)
        .bind(content_hash)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_version)
    }

    /// All versions for a project, newest first.
    pub async fn list_artifact_versions(
        &self,
        project_id: &str,
    ) -> RepoResult<Vec<ArtifactVersionRow>> {
        let rows = sqlx::query(
            "SELECT * FROM artifact_versions WHERE project_id = ? ORDER BY version DESC",
        )
        .bind(project_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(row_to_version).collect()
    }

    /// One specific version.
    pub async fn get_artifact_version(
        &self,
        project_id: &str,
        version: i64,
    ) -> RepoResult<Option<ArtifactVersionRow>> {
        let row =
            sqlx::query("SELECT * FROM artifact_versions WHERE project_id = ? AND version = ?")
                .bind(project_id)
                .bind(version)
                .fetch_optional(self.pool())
                .await?;
        row.as_ref().map(row_to_version).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_are_monotonic_and_dense() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        for i in 1..=3 {
            let v = store
                .save_artifact(
                    &project.id,
                    &format!("content {i}"),
                    &format!("hash{i}"),
                    TriggerReason::ScheduledCheck,
                )
                .await
                .unwrap();
            assert_eq!(v, i);
        }

        let versions = store.list_artifact_versions(&project.id).await.unwrap();
        let numbers: Vec<i64> = versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![3, 2, 1]);

        // Timestamp ordering matches version ordering.
        assert!(versions[0].generated_at >= versions[2].generated_at);
    }

    #[tokio::test]
    async fn test_current_artifact_tracks_latest() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        store
            .save_artifact(&project.id, "old", "h1", TriggerReason::Initial)
            .await
            .unwrap();
        store
            .save_artifact(&project.id, "new", "h2", TriggerReason::Manual)
            .await
            .unwrap();

        let current = store.get_artifact(&project.id).await.unwrap().unwrap();
        assert_eq!(current.content, "new");
        assert_eq!(current.content_hash, "h2");
    }

    #[tokio::test]
    async fn test_version_lookup_and_trigger_reason() {
        let store = Store::memory().await.unwrap();
        let project = store
            .create_project("https://example.com", "Example")
            .await
            .unwrap();

        store
            .save_artifact(
                &project.id,
                "c",
                "h",
                TriggerReason::LightweightChangeDetected,
            )
            .await
            .unwrap();

        let v1 = store
            .get_artifact_version(&project.id, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            v1.trigger_reason,
            Some(TriggerReason::LightweightChangeDetected)
        );
        assert!(store
            .get_artifact_version(&project.id, 99)
            .await
            .unwrap()
            .is_none());
    }
}
