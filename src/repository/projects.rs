//! Project CRUD.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::utils::normalize_url;

use super::models::{fmt_timestamp, parse_opt_timestamp, parse_timestamp, Project, ProjectStatus};
use super::{RepoResult, RepositoryError, Store};

fn row_to_project(row: &sqlx::sqlite::SqliteRow) -> RepoResult<Project> {
    Ok(Project {
        id: row.get("id"),
        url: row.get("url"),
        name: row.get("name"),
        status: ProjectStatus::parse(row.get::<String, _>("status").as_str()),
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        last_checked_at: parse_opt_timestamp(row.get("last_checked_at"))?,
    })
}

impl Store {
    /// Create a project. The URL is normalized and must be unique; a
    /// duplicate maps to [`RepositoryError::Conflict`].
    pub async fn create_project(&self, url: &str, name: &str) -> RepoResult<Project> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            url: normalize_url(url),
            name: name.to_string(),
            status: ProjectStatus::Pending,
            created_at: Utc::now(),
            last_checked_at: None,
        };

        let result = sqlx::query(
            "INSERT INTO projects (id, url, name, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&project.id)
        .bind(&project.url)
        .bind(&project.name)
        .bind(project.status.as_str())
        .bind(fmt_timestamp(project.created_at))
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => Ok(project),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                RepositoryError::Conflict(format!("project with url {} already exists", project.url)),
            ),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_project(&self, project_id: &str) -> RepoResult<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(row_to_project).transpose()
    }

    pub async fn get_project_by_url(&self, url: &str) -> RepoResult<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE url = ?")
            .bind(normalize_url(url))
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(row_to_project).transpose()
    }

    pub async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let rows = sqlx::query("SELECT * FROM projects ORDER BY created_at DESC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(row_to_project).collect()
    }

    pub async fn set_project_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
    ) -> RepoResult<()> {
        let result = sqlx::query("UPDATE projects SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(project_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { what: "project" });
        }
        Ok(())
    }

    /// Record that a check ran now, regardless of outcome.
    pub async fn touch_last_checked(&self, project_id: &str) -> RepoResult<()> {
        sqlx::query("UPDATE projects SET last_checked_at = ? WHERE id = ?")
            .bind(fmt_timestamp(Utc::now()))
            .bind(project_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Delete a project. Children cascade via foreign keys.
    pub async fn delete_project(&self, project_id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
