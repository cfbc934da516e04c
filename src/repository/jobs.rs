//! Crawl job rows: audit trail and conflict gating for crawl operations.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::models::{
    fmt_timestamp, parse_opt_timestamp, parse_timestamp, CrawlJobRow, JobStatus, TriggerReason,
};
use super::{RepoResult, RepositoryError, Store};

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> RepoResult<CrawlJobRow> {
    Ok(CrawlJobRow {
        id: row.get("id"),
        project_id: row.get("project_id"),
        status: JobStatus::parse(row.get::<String, _>("status").as_str()),
        trigger_reason: TriggerReason::parse(row.get::<String, _>("trigger_reason").as_str()),
        pages_crawled: row.get("pages_crawled"),
        pages_changed: row.get("pages_changed"),
        error_message: row.get("error_message"),
        started_at: parse_opt_timestamp(row.get("started_at"))?,
        completed_at: parse_opt_timestamp(row.get("completed_at"))?,
        created_at: parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        task_handle: row.get("task_handle"),
    })
}

impl Store {
    pub async fn create_job(
        &self,
        project_id: &str,
        trigger_reason: TriggerReason,
    ) -> RepoResult<CrawlJobRow> {
        let job = CrawlJobRow {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            status: JobStatus::Pending,
            trigger_reason,
            pages_crawled: 0,
            pages_changed: 0,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            task_handle: None,
        };

        sqlx::query(
            "INSERT INTO crawl_jobs (id, project_id, status, trigger_reason, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.project_id)
        .bind(job.status.as_str())
        .bind(job.trigger_reason.as_str())
        .bind(fmt_timestamp(job.created_at))
        .execute(self.pool())
        .await?;

        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> RepoResult<Option<CrawlJobRow>> {
        let row = sqlx::query("SELECT * FROM crawl_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(row_to_job).transpose()
    }

    pub async fn latest_job(&self, project_id: &str) -> RepoResult<Option<CrawlJobRow>> {
        let row = sqlx::query(
            "SELECT * FROM crawl_jobs WHERE project_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(project_id)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(row_to_job).transpose()
    }

    /// Mark a job running. Only pending jobs can start.
    pub async fn start_job(&self, job_id: &str) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE crawl_jobs SET status = 'running', started_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(fmt_timestamp(Utc::now()))
        .bind(job_id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "job {job_id} is not pending"
            )));
        }
        Ok(())
    }

    /// Mark a job completed. Terminal rows are immutable, so completed and
    /// failed jobs are never updated again.
    pub async fn complete_job(
        &self,
        job_id: &str,
        pages_crawled: i64,
        pages_changed: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET status = 'completed', completed_at = ?, \
             pages_crawled = ?, pages_changed = ? \
             WHERE id = ? AND status IN ('pending', 'running')",
        )
        .bind(fmt_timestamp(Utc::now()))
        .bind(pages_crawled)
        .bind(pages_changed)
        .bind(job_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Mark a job failed with a reason.
    pub async fn fail_job(&self, job_id: &str, error_message: &str) -> RepoResult<()> {
        sqlx::query(
            "UPDATE crawl_jobs SET status = 'failed', completed_at = ?, error_message = ? \
             WHERE id = ? AND status IN ('pending', 'running')",
        )
        .bind(fmt_timestamp(Utc::now()))
        .bind(error_message)
        .bind(job_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Attach the executor's handle for status tracking.
    pub async fn set_job_task_handle(&self, job_id: &str, handle: &str) -> RepoResult<()> {
        sqlx::query("UPDATE crawl_jobs SET task_handle = ? WHERE id = ?")
            .bind(handle)
            .bind(job_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
