//! Dispatch loops: pop due projects from the scheduler and spawn tasks.
//!
//! At-most-once per tick comes from the scheduler's atomic pops; a worker
//! that crashes after popping simply loses that tick, and the task's own
//! rescheduling puts the project back in rotation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::repository::TriggerReason;

use super::{run_full_rescrape, run_lightweight_check, TaskContext, TaskError};

/// Lightweight tick period.
const LIGHTWEIGHT_TICK: Duration = Duration::from_secs(60);
/// Full-check tick period.
const FULL_TICK: Duration = Duration::from_secs(3600);

const LIGHTWEIGHT_POP_LIMIT: usize = 500;
const FULL_POP_LIMIT: usize = 100;

/// Pop due lightweight checks and spawn one sweep per project. Returns how
/// many were dispatched.
pub async fn dispatch_lightweight_tick(ctx: &Arc<TaskContext>) -> Result<usize, TaskError> {
    let due = ctx
        .scheduler
        .get_due_lightweight_checks(LIGHTWEIGHT_POP_LIMIT)
        .await?;
    let count = due.len();

    for project_id in due {
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            if let Err(err) = run_lightweight_check(Arc::clone(&ctx), &project_id).await {
                warn!(%project_id, error = %err, "lightweight check task failed");
            }
        });
    }

    if count > 0 {
        info!(count, "dispatched lightweight checks");
    }
    Ok(count)
}

/// Pop due full checks and spawn one rescrape per project.
pub async fn dispatch_full_tick(ctx: &Arc<TaskContext>) -> Result<usize, TaskError> {
    let due = ctx.scheduler.get_due_full_checks(FULL_POP_LIMIT).await?;
    let count = due.len();

    for project_id in due {
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let job = match ctx
                .store
                .create_job(&project_id, TriggerReason::ScheduledCheck)
                .await
            {
                Ok(job) => job,
                Err(err) => {
                    warn!(%project_id, error = %err, "could not create scheduled crawl job");
                    return;
                }
            };
            if let Err(err) = run_full_rescrape(&ctx, &project_id, &job.id).await {
                warn!(%project_id, error = %err, "full rescrape task failed");
            }
        });
    }

    if count > 0 {
        info!(count, "dispatched full rescrapes");
    }
    Ok(count)
}

/// Run both dispatch loops until the process stops.
///
/// Each tick is bounded by the dispatch soft time limit; a slow or failed
/// tick is logged and the loop continues, because the popped state is
/// already safe (lost ticks reschedule themselves on the task side).
pub async fn run_dispatch_loops(ctx: Arc<TaskContext>) {
    let dispatch_limit = Duration::from_secs(ctx.settings.dispatch_soft_time_limit_secs);

    let lightweight = {
        let ctx = Arc::clone(&ctx);
        async move {
            let mut tick = tokio::time::interval(LIGHTWEIGHT_TICK);
            loop {
                tick.tick().await;
                match tokio::time::timeout(dispatch_limit, dispatch_lightweight_tick(&ctx)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => warn!(error = %err, "lightweight dispatch failed"),
                    Err(_) => warn!("lightweight dispatch exceeded soft time limit"),
                }
            }
        }
    };

    let full = {
        let ctx = Arc::clone(&ctx);
        async move {
            let mut tick = tokio::time::interval(FULL_TICK);
            loop {
                tick.tick().await;
                match tokio::time::timeout(dispatch_limit, dispatch_full_tick(&ctx)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => warn!(error = %err, "full dispatch failed"),
                    Err(_) => warn!("full dispatch exceeded soft time limit"),
                }
            }
        }
    };

    tokio::join!(lightweight, full);
}
