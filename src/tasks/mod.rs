//! Background task layer.
//!
//! Thin orchestration over the services: each task loads state, drives the
//! relevant components, records its outcome on the crawl job, and returns a
//! report. Business failures (provider errors, timeouts, missing projects)
//! are recorded and returned, never raised to the executor; only
//! infrastructure errors propagate so redelivery stays reserved for real
//! outages.

pub mod dispatch;
mod full_rescrape;
mod initial_crawl;
mod lightweight;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::checker::CheckError;
use crate::config::Settings;
use crate::planner::PlanError;
use crate::probe::FingerprintProbe;
use crate::progress::ProgressTracker;
use crate::providers::{Crawler, LlmCurator};
use crate::repository::{RepositoryError, Store};
use crate::scheduler::{Scheduler, SchedulerError};

pub use full_rescrape::run_full_rescrape;
pub use initial_crawl::run_initial_crawl;
pub use lightweight::run_lightweight_check;

/// Infrastructure errors a task may raise to the executor.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl From<CheckError> for TaskError {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::Repository(e) => Self::Repository(e),
            CheckError::Scheduler(e) => Self::Scheduler(e),
        }
    }
}

/// How a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed,
    Skipped,
    TimedOut,
}

/// What a task did, for logging and the surrounding API.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub status: TaskStatus,
    pub project_id: String,
    pub pages_crawled: usize,
    pub pages_changed: usize,
    pub artifact_version: Option<i64>,
    pub message: Option<String>,
}

impl TaskReport {
    fn skipped(project_id: &str, message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Skipped,
            project_id: project_id.to_string(),
            pages_crawled: 0,
            pages_changed: 0,
            artifact_version: None,
            message: Some(message.into()),
        }
    }

    fn failed(project_id: &str, message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            project_id: project_id.to_string(),
            pages_crawled: 0,
            pages_changed: 0,
            artifact_version: None,
            message: Some(message.into()),
        }
    }

    fn timed_out(project_id: &str, message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::TimedOut,
            project_id: project_id.to_string(),
            pages_crawled: 0,
            pages_changed: 0,
            artifact_version: None,
            message: Some(message.into()),
        }
    }
}

/// Everything a task needs, owned by the composition root and threaded in
/// explicitly. No process globals.
pub struct TaskContext {
    pub store: Store,
    pub scheduler: Scheduler,
    pub progress: ProgressTracker,
    pub probe: FingerprintProbe,
    pub crawler: Arc<dyn Crawler>,
    pub curator: Arc<dyn LlmCurator>,
    pub settings: Settings,
}

impl TaskContext {
    pub(crate) fn planner(&self) -> crate::planner::Planner<'_> {
        crate::planner::Planner::new(
            &self.store,
            self.crawler.as_ref(),
            self.curator.as_ref(),
            &self.settings,
        )
    }
}

/// Map a planner failure onto the crawl job and project, returning the
/// failed report. Infrastructure errors pass through.
pub(crate) async fn record_plan_failure(
    ctx: &TaskContext,
    project_id: &str,
    job_id: &str,
    err: PlanError,
) -> Result<TaskReport, TaskError> {
    match err {
        PlanError::Repository(e) => Err(TaskError::Repository(e)),
        PlanError::Provider(e) => {
            let message = format!("provider failure: {e}");
            ctx.store.fail_job(job_id, &message).await?;
            ctx.store
                .set_project_status(project_id, crate::repository::ProjectStatus::Failed)
                .await?;
            Ok(TaskReport::failed(project_id, message))
        }
    }
}
