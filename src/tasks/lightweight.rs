//! Lightweight-check task wrapper.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::checker::{CheckOutcome, LightweightChecker, TriggerOutcome};

use super::{run_full_rescrape, TaskContext, TaskError, TaskReport, TaskStatus};

/// Run one lightweight sweep for a project.
///
/// Always reschedules the lightweight timer, whatever happened: a failed
/// or suppressed sweep must not drop the project out of rotation. When the
/// sweep triggers a rescrape, the full-rescrape task is spawned in the
/// background.
pub async fn run_lightweight_check(
    ctx: Arc<TaskContext>,
    project_id: &str,
) -> Result<TaskReport, TaskError> {
    let limit = Duration::from_secs(ctx.settings.lightweight_soft_time_limit_secs);
    let checker = LightweightChecker::new(
        ctx.store.clone(),
        ctx.scheduler.clone(),
        ctx.probe.clone(),
        ctx.settings.clone(),
    );

    let result = tokio::time::timeout(limit, checker.check_project(project_id)).await;

    // The timer advances regardless of outcome.
    ctx.scheduler
        .schedule_lightweight_check(project_id, None)
        .await?;

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => return Err(err.into()),
        Err(_) => {
            error!(project_id, "lightweight check exceeded soft time limit");
            return Ok(TaskReport::timed_out(
                project_id,
                format!("lightweight check timed out after {}s", limit.as_secs()),
            ));
        }
    };

    match outcome {
        CheckOutcome::Skipped { reason } => {
            info!(project_id, %reason, "lightweight check skipped");
            Ok(TaskReport::skipped(project_id, reason))
        }
        CheckOutcome::Completed(report) => {
            if let Some(TriggerOutcome::Triggered { job_id }) = &report.trigger {
                let ctx = Arc::clone(&ctx);
                let project_id = project_id.to_string();
                let job_id = job_id.clone();
                tokio::spawn(async move {
                    if let Err(err) = run_full_rescrape(&ctx, &project_id, &job_id).await {
                        warn!(%project_id, error = %err, "spawned full rescrape failed");
                    }
                });
            }

            info!(
                project_id,
                total = report.total_pages,
                changed = report.changed_urls.len(),
                errored = report.errored,
                triggered = matches!(report.trigger, Some(TriggerOutcome::Triggered { .. })),
                "lightweight check complete"
            );

            Ok(TaskReport {
                status: TaskStatus::Completed,
                project_id: project_id.to_string(),
                pages_crawled: 0,
                pages_changed: report.changed_urls.len(),
                artifact_version: None,
                message: None,
            })
        }
    }
}
