//! Full rescrape: crawl, plan, execute, adjust backoff, reschedule.

use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::planner::PlanDecision;
use crate::progress::Stage;
use crate::repository::{NewPage, ProjectStatus};

use super::initial_crawl::new_page_from_record;
use super::{record_plan_failure, TaskContext, TaskError, TaskReport, TaskStatus};

/// The heavy flow for one project.
///
/// Asserts the per-project single-writer gate (status must be `pending` or
/// `ready`), crawls, classifies via the planner, executes the minimal
/// regeneration, then does the Stage H bookkeeping: page rows at a new
/// version with cleared ETags, backoff on the outcome bit, both timers
/// rescheduled.
pub async fn run_full_rescrape(
    ctx: &TaskContext,
    project_id: &str,
    job_id: &str,
) -> Result<TaskReport, TaskError> {
    let limit = Duration::from_secs(ctx.settings.crawl_soft_time_limit_secs);
    match tokio::time::timeout(limit, rescrape_inner(ctx, project_id, job_id)).await {
        Ok(result) => result,
        Err(_) => {
            error!(project_id, "full rescrape exceeded soft time limit");
            let message = format!("rescrape timed out after {}s", limit.as_secs());
            ctx.store.fail_job(job_id, &message).await?;
            ctx.store
                .set_project_status(project_id, ProjectStatus::Failed)
                .await?;
            Ok(TaskReport::timed_out(project_id, message))
        }
    }
}

async fn rescrape_inner(
    ctx: &TaskContext,
    project_id: &str,
    job_id: &str,
) -> Result<TaskReport, TaskError> {
    let Some(project) = ctx.store.get_project(project_id).await? else {
        return Ok(TaskReport::skipped(project_id, "project not found"));
    };
    if !matches!(project.status, ProjectStatus::Pending | ProjectStatus::Ready) {
        return Ok(TaskReport::skipped(
            project_id,
            format!("another crawl owns this project (status {})", project.status.as_str()),
        ));
    }
    let Some(job) = ctx.store.get_job(job_id).await? else {
        return Ok(TaskReport::skipped(project_id, "job not found"));
    };

    ctx.store
        .set_project_status(project_id, ProjectStatus::Crawling)
        .await?;
    ctx.store.start_job(job_id).await?;

    let started = Instant::now();
    ctx.progress
        .update(project_id, Stage::Crawl, 0, 0, 0.0, Some(project.url.as_str()), None)
        .await;

    let crawl = match ctx
        .crawler
        .crawl_site(&project.url, ctx.settings.max_pages_per_crawl)
        .await
    {
        Ok(pages) if !pages.is_empty() => pages,
        Ok(_) => {
            let message = "crawler returned no pages".to_string();
            ctx.store.fail_job(job_id, &message).await?;
            ctx.store
                .set_project_status(project_id, ProjectStatus::Failed)
                .await?;
            return Ok(TaskReport::failed(project_id, message));
        }
        Err(err) => {
            let message = format!("crawl failed: {err}");
            ctx.store.fail_job(job_id, &message).await?;
            ctx.store
                .set_project_status(project_id, ProjectStatus::Failed)
                .await?;
            return Ok(TaskReport::failed(project_id, message));
        }
    };

    ctx.progress
        .update(
            project_id,
            Stage::Analyze,
            0,
            1,
            started.elapsed().as_secs_f64(),
            None,
            Some("classifying changes"),
        )
        .await;

    let planner = ctx.planner();
    let plan = match planner.plan(&project, &crawl).await {
        Ok(plan) => plan,
        Err(err) => return record_plan_failure(ctx, project_id, job_id, err).await,
    };

    let outcome = match planner
        .execute(&project, &plan, &crawl, job.trigger_reason)
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => return record_plan_failure(ctx, project_id, job_id, err).await,
    };

    // Stage H bookkeeping. Page rows are written at a fresh version even on
    // a no-op so the next lightweight sweep works from current hashes, with
    // ETags cleared so the next HEAD re-observes identity values.
    let version = ctx.store.max_page_version(project_id).await? + 1;
    let new_pages: Vec<NewPage> = crawl.iter().map(new_page_from_record).collect();
    ctx.store.save_pages(project_id, version, &new_pages).await?;

    let new_interval = ctx
        .scheduler
        .apply_backoff(project_id, outcome.did_work)
        .await?;
    ctx.scheduler
        .schedule_full_check(project_id, Some(new_interval), None)
        .await?;
    ctx.scheduler
        .schedule_lightweight_check(project_id, None)
        .await?;

    ctx.store
        .set_project_status(project_id, ProjectStatus::Ready)
        .await?;
    ctx.store.touch_last_checked(project_id).await?;
    ctx.store
        .complete_job(job_id, crawl.len() as i64, plan.hash_mismatch.len() as i64)
        .await?;

    ctx.progress
        .update(
            project_id,
            Stage::Complete,
            crawl.len() as u64,
            crawl.len() as u64,
            started.elapsed().as_secs_f64(),
            None,
            None,
        )
        .await;

    info!(
        project_id,
        decision = ?plan.decision,
        did_work = outcome.did_work,
        artifact_version = ?outcome.artifact_version,
        new_interval,
        "full rescrape complete"
    );

    let message = match plan.decision {
        PlanDecision::NoOp => Some("no content changes detected".to_string()),
        _ => None,
    };

    Ok(TaskReport {
        status: TaskStatus::Completed,
        project_id: project_id.to_string(),
        pages_crawled: crawl.len(),
        pages_changed: plan.hash_mismatch.len(),
        artifact_version: outcome.artifact_version,
        message,
    })
}
