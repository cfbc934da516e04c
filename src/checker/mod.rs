//! Lightweight batch checker: the cheap, high-frequency sweep.
//!
//! One invocation probes every page of one project with conditional HEADs,
//! reconciles header-less origins through semantic sampling, aggregates
//! drift, and decides whether to trigger a full rescrape. The cooldown gate
//! lives here: however strong the signal, a project in cooldown is never
//! re-triggered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analyzer::{BatchSignificance, ChangeAnalyzer, ChangedPage, SignificanceReason};
use crate::config::Settings;
use crate::extractor::extract_fingerprint;
use crate::probe::{FingerprintProbe, ProbeOutcome, ProbeResult};
use crate::repository::{
    CrawlJobRow, PageRow, ProjectStatus, RepositoryError, Store, TriggerReason,
};
use crate::scheduler::{Scheduler, SchedulerError};

/// Errors that fail a whole check invocation. Per-page probe failures are
/// counted, not raised.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Result of a rescrape trigger attempt.
#[derive(Debug, Clone)]
pub enum TriggerResult {
    /// A crawl job was created and the project handed to the heavy flow.
    Triggered { job: CrawlJobRow },
    /// Cooldown suppressed the trigger regardless of signal strength.
    Suppressed { remaining_hours: f64 },
}

/// What one lightweight sweep observed and decided.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub total_pages: usize,
    pub changed_urls: Vec<String>,
    pub first_observations: usize,
    pub sample_checks: usize,
    pub errored: usize,
    pub significance: Option<BatchSignificance>,
    pub trigger: Option<TriggerOutcome>,
}

/// Serializable mirror of [`TriggerResult`] for reporting.
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    Triggered { job_id: String },
    Suppressed { remaining_hours: f64 },
}

/// Outcome of a check invocation.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// Project missing or not in `ready` status; nothing was probed.
    Skipped { reason: String },
    Completed(CheckReport),
}

/// Runs lightweight sweeps for projects.
pub struct LightweightChecker {
    store: Store,
    scheduler: Scheduler,
    probe: FingerprintProbe,
    settings: Settings,
}

impl LightweightChecker {
    #[must_use]
    pub fn new(store: Store, scheduler: Scheduler, probe: FingerprintProbe, settings: Settings) -> Self {
        Self {
            store,
            scheduler,
            probe,
            settings,
        }
    }

    /// Run one sweep over a project's current page set.
    pub fn check_project<'a>(
        &'a self,
        project_id: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<CheckOutcome, CheckError>> + Send + 'a>>
    {
        Box::pin(self.check_project_inner(project_id))
    }

    async fn check_project_inner(&self, project_id: &str) -> Result<CheckOutcome, CheckError> {
        let Some(project) = self.store.get_project(project_id).await? else {
            return Ok(CheckOutcome::Skipped {
                reason: "project not found".to_string(),
            });
        };
        if project.status != ProjectStatus::Ready {
            return Ok(CheckOutcome::Skipped {
                reason: format!("project status is {}", project.status.as_str()),
            });
        }

        let version = self.store.max_page_version(project_id).await?;
        let pages = self.store.get_pages(project_id, Some(version)).await?;
        if pages.is_empty() {
            return Ok(CheckOutcome::Skipped {
                reason: "no pages crawled yet".to_string(),
            });
        }

        let total = pages.len();
        let results = self.probe_all(&pages).await;

        let mut report = CheckReport {
            total_pages: total,
            ..Default::default()
        };

        let page_by_url: HashMap<&str, &PageRow> =
            pages.iter().map(|p| (p.url.as_str(), p)).collect();
        let mut changed: Vec<ProbeResult> = Vec::new();
        let mut needs_sample: Vec<ProbeResult> = Vec::new();

        for result in &results {
            match &result.outcome {
                ProbeOutcome::Changed { .. } => changed.push(result.clone()),
                ProbeOutcome::NeedsSampleCheck => needs_sample.push(result.clone()),
                ProbeOutcome::FirstObservation => {
                    report.first_observations += 1;
                    self.record_first_observation(project_id, version, result)
                        .await?;
                }
                ProbeOutcome::UnchangedWithError { error } => {
                    report.errored += 1;
                    debug!(url = %result.url, %error, "probe failed, fingerprints untouched");
                }
                ProbeOutcome::Unchanged => {}
            }
        }

        // Sample reconciliation only runs when headers found nothing: a
        // single header-signalled change makes the extra GETs pointless.
        if changed.is_empty() && !needs_sample.is_empty() {
            for result in &needs_sample {
                report.sample_checks += 1;
                match self.sample_changed(&page_by_url, result).await {
                    Some(true) => changed.push(result.clone()),
                    Some(false) => {}
                    None => report.errored += 1,
                }
            }
        }

        report.changed_urls = changed.iter().map(|r| r.url.clone()).collect();

        if changed.is_empty() {
            self.store.touch_last_checked(project_id).await?;
            return Ok(CheckOutcome::Completed(report));
        }

        let analyzer = ChangeAnalyzer::new(
            self.settings.lightweight_significance_threshold,
            self.settings.lightweight_change_threshold_percent,
        );

        // Bulk fast path first, on stubs: no body is fetched unless the
        // ratio alone cannot decide.
        let stubs: Vec<ChangedPage> = changed
            .iter()
            .map(|r| ChangedPage {
                url: r.url.clone(),
                baseline_html: String::new(),
                current_html: String::new(),
            })
            .collect();
        let bulk = analyzer.analyze_batch(&stubs, total);
        if bulk.reason == SignificanceReason::BulkChange {
            info!(project_id, changed = changed.len(), total, "bulk change, short-circuiting");
            report.significance = Some(bulk);
            report.trigger = Some(self.trigger_to_outcome(
                self.trigger_rescrape(project_id).await?,
            ));
            return Ok(CheckOutcome::Completed(report));
        }

        // Cumulative drift: fetch current bodies and score against the
        // preserved baselines.
        let mut drift_pages: Vec<ChangedPage> = Vec::new();
        for result in &changed {
            let baseline = page_by_url
                .get(result.url.as_str())
                .and_then(|p| p.first_paragraph.clone())
                .unwrap_or_default();
            match self.probe.fetch_body(&result.url).await {
                Ok(body) => drift_pages.push(ChangedPage {
                    url: result.url.clone(),
                    baseline_html: baseline,
                    current_html: body,
                }),
                Err(err) => {
                    report.errored += 1;
                    warn!(url = %result.url, error = %err, "body fetch failed during drift analysis");
                }
            }
        }

        let significance = analyzer.analyze_batch(&drift_pages, total);
        let significant = significance.significant;
        report.significance = Some(significance);

        if significant {
            report.trigger = Some(self.trigger_to_outcome(
                self.trigger_rescrape(project_id).await?,
            ));
        } else {
            // Advance identity headers so the same header flip does not
            // re-signal every sweep. The drift baseline stays as it is, so
            // slow-burn change keeps accumulating toward the threshold.
            for result in &changed {
                let sample_hash = match result.outcome {
                    ProbeOutcome::NeedsSampleCheck => self
                        .probe
                        .fetch_body(&result.url)
                        .await
                        .ok()
                        .map(|body| extract_fingerprint(&body)),
                    _ => None,
                };
                self.store
                    .update_page_fingerprint(
                        project_id,
                        &result.url,
                        version,
                        &result.observed,
                        sample_hash.as_deref(),
                    )
                    .await?;
            }
        }

        self.store.touch_last_checked(project_id).await?;
        Ok(CheckOutcome::Completed(report))
    }

    /// Fan out probes, bounded by the configured concurrency and spaced by
    /// the politeness delay.
    async fn probe_all(&self, pages: &[PageRow]) -> Vec<ProbeResult> {
        let delay = Duration::from_millis(self.settings.lightweight_request_delay_ms);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.settings.lightweight_concurrent_requests,
        ));

        let targets: Vec<(String, _)> = pages.iter().map(|page| (page.url.clone(), page.fingerprint())).collect();

        stream::iter(targets.into_iter().map(|(url, fingerprint)| {
            let semaphore = Arc::clone(&semaphore);
            let probe = self.probe.clone();
            async move {
                // Closed only on drop; holding the permit for the request
                // is the entire point.
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                probe.probe(&url, &fingerprint).await
            }
        }))
        .buffer_unordered(self.settings.lightweight_concurrent_requests)
        .collect()
        .await
    }

    /// Persist everything observed on a first observation; header-less
    /// origins additionally get a semantic sample stored.
    async fn record_first_observation(
        &self,
        project_id: &str,
        version: i64,
        result: &ProbeResult,
    ) -> Result<(), CheckError> {
        let observed = &result.observed;
        let headerless = observed.etag.is_none()
            && observed.last_modified.is_none()
            && observed.content_length.is_none();

        let sample_hash = if headerless {
            match self.probe.fetch_body(&result.url).await {
                Ok(body) => Some(extract_fingerprint(&body)),
                Err(err) => {
                    warn!(url = %result.url, error = %err, "sample fetch failed on first observation");
                    None
                }
            }
        } else {
            None
        };

        self.store
            .update_page_fingerprint(project_id, &result.url, version, observed, sample_hash.as_deref())
            .await?;
        Ok(())
    }

    /// GET the body and compare semantic fingerprints. `Some(true)` means
    /// the page really changed, `None` means the fetch failed.
    async fn sample_changed(
        &self,
        page_by_url: &HashMap<&str, &PageRow>,
        result: &ProbeResult,
    ) -> Option<bool> {
        let stored = page_by_url
            .get(result.url.as_str())
            .and_then(|p| p.sample_hash.clone())?;

        match self.probe.fetch_body(&result.url).await {
            Ok(body) => Some(extract_fingerprint(&body) != stored),
            Err(err) => {
                warn!(url = %result.url, error = %err, "sample fetch failed");
                None
            }
        }
    }

    /// Attempt to hand the project to the heavy flow.
    ///
    /// The cooldown gate here is the system's most important invariant:
    /// it is checked first, regardless of how strong the change signal
    /// was. On success a crawl job is recorded, the project drops back to
    /// `pending`, a fresh cooldown begins, and the full-check timer resets
    /// to the current interval.
    pub async fn trigger_rescrape(&self, project_id: &str) -> Result<TriggerResult, CheckError> {
        if let Some(remaining_hours) = self
            .scheduler
            .cooldown_remaining_hours(project_id)
            .await?
        {
            info!(project_id, remaining_hours, "rescrape suppressed by cooldown");
            return Ok(TriggerResult::Suppressed { remaining_hours });
        }

        let job = self
            .store
            .create_job(project_id, TriggerReason::LightweightChangeDetected)
            .await?;
        self.store
            .set_project_status(project_id, ProjectStatus::Pending)
            .await?;
        self.store.touch_last_checked(project_id).await?;
        self.scheduler.set_cooldown(project_id, None).await?;

        let interval = self.scheduler.get_check_interval(project_id).await?;
        self.scheduler
            .schedule_full_check(project_id, Some(interval), None)
            .await?;

        info!(project_id, job_id = %job.id, "full rescrape triggered");
        Ok(TriggerResult::Triggered { job })
    }

    fn trigger_to_outcome(&self, result: TriggerResult) -> TriggerOutcome {
        match result {
            TriggerResult::Triggered { job } => TriggerOutcome::Triggered { job_id: job.id },
            TriggerResult::Suppressed { remaining_hours } => {
                TriggerOutcome::Suppressed { remaining_hours }
            }
        }
    }
}
