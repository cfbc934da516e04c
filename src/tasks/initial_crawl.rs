//! Initial crawl: crawl, filter, curate, generate, enroll in the timers.

use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::merger::{assemble_artifact, compute_section_hash};
use crate::progress::Stage;
use crate::providers::{filter_relevant_pages, PageRecord};
use crate::repository::{NewPage, ProjectStatus};
use crate::utils::normalize_url;

use super::{TaskContext, TaskError, TaskReport, TaskStatus};

/// Baseline preview length stored per page for later drift scoring.
const BASELINE_PREVIEW_CHARS: usize = 2000;

pub(crate) fn new_page_from_record(record: &PageRecord) -> NewPage {
    let first_paragraph: String = record.markdown.chars().take(BASELINE_PREVIEW_CHARS).collect();
    NewPage {
        url: record.url.clone(),
        title: Some(record.title.clone()),
        description: record.description.clone(),
        first_paragraph: (!first_paragraph.is_empty()).then_some(first_paragraph),
        content_hash: Some(record.content_hash.clone()),
        // Identity headers stay empty: the next HEAD observes fresh values.
        etag: None,
        last_modified_header: None,
        content_length: None,
        sample_hash: record.sample_hash.clone(),
        depth: i64::from(record.depth),
    }
}

/// Crawl a new project end to end and bring it to `ready`.
///
/// The soft time limit marks the job failed and the project `failed`; the
/// scheduler's next tick retries after backoff.
pub async fn run_initial_crawl(
    ctx: &TaskContext,
    project_id: &str,
    job_id: &str,
) -> Result<TaskReport, TaskError> {
    let limit = Duration::from_secs(ctx.settings.crawl_soft_time_limit_secs);
    match tokio::time::timeout(limit, initial_crawl_inner(ctx, project_id, job_id)).await {
        Ok(result) => result,
        Err(_) => {
            error!(project_id, "initial crawl exceeded soft time limit");
            let message = format!(
                "crawl timed out after {}s - site may be protected or too large",
                limit.as_secs()
            );
            ctx.store.fail_job(job_id, &message).await?;
            ctx.store
                .set_project_status(project_id, ProjectStatus::Failed)
                .await?;
            Ok(TaskReport::timed_out(project_id, message))
        }
    }
}

async fn initial_crawl_inner(
    ctx: &TaskContext,
    project_id: &str,
    job_id: &str,
) -> Result<TaskReport, TaskError> {
    let Some(project) = ctx.store.get_project(project_id).await? else {
        return Ok(TaskReport::skipped(project_id, "project not found"));
    };
    if ctx.store.get_job(job_id).await?.is_none() {
        return Ok(TaskReport::skipped(project_id, "job not found"));
    }

    ctx.store
        .set_project_status(project_id, ProjectStatus::Crawling)
        .await?;
    ctx.store.start_job(job_id).await?;

    let started = Instant::now();
    info!(project_id, url = %project.url, "starting initial crawl");
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

    let total = crawl.len();
    info!(project_id, pages = total, "crawl complete");
    ctx.progress
        .update(
            project_id,
            Stage::Crawl,
            total as u64,
            total as u64,
            started.elapsed().as_secs_f64(),
            None,
            Some("complete"),
        )
        .await;

    // Relevance filter, homepage always preserved.
    ctx.progress
        .update(project_id, Stage::Filter, 0, 1, 0.0, None, Some("classifying page relevance"))
        .await;
    let relevant = filter_relevant_pages(
        ctx.curator.as_ref(),
        &crawl,
        ctx.settings.relevance_batch_size,
    )
    .await;
    info!(project_id, relevant = relevant.len(), total, "relevance filter complete");

    // Full curation. No safe fallback exists here: without curated
    // structure there is nothing to assemble.
    ctx.progress
        .update(project_id, Stage::Curate, 0, 1, 0.0, None, Some("curating pages"))
        .await;
    let curation = match ctx.curator.curate_full(&relevant).await {
        Ok(result) => result,
        Err(err) => {
            let message = format!("curation failed: {err}");
            ctx.store.fail_job(job_id, &message).await?;
            ctx.store
                .set_project_status(project_id, ProjectStatus::Failed)
                .await?;
            return Ok(TaskReport::failed(project_id, message));
        }
    };

    // Persist raw pages at version 1 (or next), the URL inventory, and the
    // curated state.
    let version = ctx.store.max_page_version(project_id).await? + 1;
    let new_pages: Vec<NewPage> = crawl.iter().map(new_page_from_record).collect();
    ctx.store.save_pages(project_id, version, &new_pages).await?;

    let urls: Vec<String> = crawl.iter().map(|p| p.url.clone()).collect();
    ctx.store.store_inventory(project_id, &urls).await?;

    let page_hashes: std::collections::HashMap<String, String> = crawl
        .iter()
        .map(|p| (normalize_url(&p.url), p.content_hash.clone()))
        .collect();
    let section_hashes: std::collections::HashMap<String, String> = curation
        .sections
        .iter()
        .map(|s| {
            let urls: Vec<String> = s.pages.iter().map(|p| normalize_url(&p.url)).collect();
            (s.name.clone(), compute_section_hash(&page_hashes, &urls))
        })
        .collect();

    ctx.store
        .replace_curated_state(
            project_id,
            &curation.site_title,
            &curation.tagline,
            &curation.overview,
            &curation.sections,
            &page_hashes,
            &section_hashes,
        )
        .await?;

    // Assemble and record the first artifact version.
    ctx.progress
        .update(project_id, Stage::Generate, 0, 1, 0.0, None, Some("assembling artifact"))
        .await;
    let overview = ctx
        .store
        .get_site_overview(project_id)
        .await?
        .ok_or(crate::repository::RepositoryError::NotFound {
            what: "site overview",
        })?;
    let sections = ctx.store.get_curated_sections(project_id).await?;
    let pages = ctx.store.get_curated_pages(project_id).await?;
    let assembled = assemble_artifact(&overview, &sections, &pages, &project.url);

    let job = ctx.store.get_job(job_id).await?;
    let trigger = job
        .map(|j| j.trigger_reason)
        .unwrap_or(crate::repository::TriggerReason::Initial);
    let artifact_version = ctx
        .store
        .save_artifact(project_id, &assembled.content, &assembled.content_hash, trigger)
        .await?;

    ctx.store
        .set_project_status(project_id, ProjectStatus::Ready)
        .await?;
    ctx.store.touch_last_checked(project_id).await?;
    ctx.store.complete_job(job_id, total as i64, 0).await?;

    // Enroll in both timers now that there is something to watch.
    ctx.scheduler.schedule_project(project_id).await?;

    let elapsed = started.elapsed().as_secs_f64();
    ctx.progress
        .update(
            project_id,
            Stage::Complete,
            total as u64,
            total as u64,
            elapsed,
            None,
            Some("done"),
        )
        .await;
    info!(
        project_id,
        pages = total,
        relevant = relevant.len(),
        sections = curation.sections.len(),
        artifact_version,
        elapsed_secs = elapsed,
        "initial crawl complete"
    );

    Ok(TaskReport {
        status: TaskStatus::Completed,
        project_id: project_id.to_string(),
        pages_crawled: total,
        pages_changed: 0,
        artifact_version: Some(artifact_version),
        message: None,
    })
}
