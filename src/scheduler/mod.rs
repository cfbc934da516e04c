//! Redis-backed scheduler using sorted sets for O(log N) due-time queries.
//!
//! Keys (owned exclusively by this module; nothing else writes them):
//! - `schedule:full_check` - projects due for full rescrape (adaptive interval)
//! - `schedule:lightweight_check` - projects due for lightweight HEAD sweeps
//! - `schedule:cooldowns` - projects that may not trigger a rescrape yet
//! - `schedule:intervals` - hash of per-project full-check intervals (hours)
//!
//! Each instance owns its connection and key namespace, so tests construct
//! isolated schedulers against the same Redis.

use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;

const FULL_CHECK_KEY: &str = "schedule:full_check";
const LIGHTWEIGHT_CHECK_KEY: &str = "schedule:lightweight_check";
const COOLDOWN_KEY: &str = "schedule:cooldowns";
const INTERVALS_KEY: &str = "schedule:intervals";

/// Errors from scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Adaptive backoff step, pure over the stored interval.
///
/// A detected change resets to the minimum; an unchanged outcome doubles
/// the interval up to the maximum. The result always lies in `[min, max]`.
#[must_use]
pub fn next_interval(current_hours: i64, changed: bool, min_hours: i64, max_hours: i64) -> i64 {
    let next = if changed {
        min_hours
    } else {
        current_hours.saturating_mul(2).min(max_hours)
    };
    next.clamp(min_hours, max_hours)
}

/// Times a project was enrolled at, returned by [`Scheduler::schedule_project`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTimes {
    pub project_id: String,
    pub full_check_at: DateTime<Utc>,
    pub lightweight_check_at: DateTime<Utc>,
}

/// Queue depths for operator observability.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleStats {
    pub full_due: u64,
    pub full_scheduled: u64,
    pub lightweight_due: u64,
    pub lightweight_scheduled: u64,
    pub cooldowns_active: u64,
    pub intervals_stored: u64,
}

/// Redis-backed scheduler for the two check timers, the cooldown set, and
/// the adaptive interval store.
#[derive(Clone)]
pub struct Scheduler {
    conn: ConnectionManager,
    namespace: String,
    default_interval_hours: i64,
    min_interval_hours: i64,
    max_interval_hours: i64,
    cooldown_hours: i64,
    lightweight_interval_minutes: i64,
}

impl Scheduler {
    /// Build a scheduler over an established Redis connection.
    #[must_use]
    pub fn new(conn: ConnectionManager, settings: &Settings) -> Self {
        Self {
            conn,
            namespace: String::new(),
            default_interval_hours: settings.default_check_interval_hours,
            min_interval_hours: settings.min_check_interval_hours,
            max_interval_hours: settings.max_check_interval_hours,
            cooldown_hours: settings.full_rescrape_cooldown_hours,
            lightweight_interval_minutes: settings.lightweight_check_interval_minutes,
        }
    }

    /// Prefix all keys with `namespace`. Used by tests to isolate state on
    /// a shared Redis; production runs with the bare key names.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn key(&self, base: &str) -> String {
        if self.namespace.is_empty() {
            base.to_string()
        } else {
            format!("{}:{}", self.namespace, base)
        }
    }

    fn now_epoch() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }

    // =========================================================================
    // Full-check timer (adaptive)
    // =========================================================================

    /// Schedule a project's next full check.
    ///
    /// Due time resolution: `run_at` if given, else now + `interval_hours`,
    /// else now + the stored interval (default when none stored). Upserts:
    /// a project has at most one entry per timer.
    pub async fn schedule_full_check(
        &self,
        project_id: &str,
        interval_hours: Option<i64>,
        run_at: Option<DateTime<Utc>>,
    ) -> SchedulerResult<DateTime<Utc>> {
        let run_at = match run_at {
            Some(at) => at,
            None => {
                let hours = match interval_hours {
                    Some(h) => h,
                    None => self.get_check_interval(project_id).await?,
                };
                Utc::now() + Duration::hours(hours)
            }
        };

        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(
                self.key(FULL_CHECK_KEY),
                project_id,
                run_at.timestamp_millis() as f64 / 1000.0,
            )
            .await?;
        debug!(project_id, %run_at, "scheduled full check");
        Ok(run_at)
    }

    /// Pop up to `limit` projects whose full check is due.
    ///
    /// Returned ids are removed before the caller sees them: the removal
    /// count from ZREM arbitrates races, so two concurrent dispatchers can
    /// never both dispatch the same project (at-most-once per tick).
    pub async fn get_due_full_checks(&self, limit: usize) -> SchedulerResult<Vec<String>> {
        self.pop_due(&self.key(FULL_CHECK_KEY), limit).await
    }

    /// Remove a project's pending full check. Idempotent.
    pub async fn cancel_full_check(&self, project_id: &str) -> SchedulerResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.zrem(self.key(FULL_CHECK_KEY), project_id).await?;
        Ok(removed > 0)
    }

    // =========================================================================
    // Lightweight-check timer (fixed interval)
    // =========================================================================

    /// Schedule a project's next lightweight HEAD sweep.
    pub async fn schedule_lightweight_check(
        &self,
        project_id: &str,
        interval_minutes: Option<i64>,
    ) -> SchedulerResult<DateTime<Utc>> {
        let minutes = interval_minutes.unwrap_or(self.lightweight_interval_minutes);
        let run_at = Utc::now() + Duration::minutes(minutes);

        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(
                self.key(LIGHTWEIGHT_CHECK_KEY),
                project_id,
                run_at.timestamp_millis() as f64 / 1000.0,
            )
            .await?;
        Ok(run_at)
    }

    /// Pop up to `limit` projects whose lightweight sweep is due.
    pub async fn get_due_lightweight_checks(&self, limit: usize) -> SchedulerResult<Vec<String>> {
        self.pop_due(&self.key(LIGHTWEIGHT_CHECK_KEY), limit).await
    }

    /// Remove a project's pending lightweight check. Idempotent.
    pub async fn cancel_lightweight_check(&self, project_id: &str) -> SchedulerResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .zrem(self.key(LIGHTWEIGHT_CHECK_KEY), project_id)
            .await?;
        Ok(removed > 0)
    }

    /// Range-query due members, then remove them in one pipelined batch.
    /// Only ids whose ZREM count came back 1 are returned; a concurrent
    /// dispatcher that lost the race sees 0 and skips the id.
    async fn pop_due(&self, key: &str, limit: usize) -> SchedulerResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let now = Self::now_epoch();

        let due: Vec<String> = conn
            .zrangebyscore_limit(key, f64::NEG_INFINITY, now, 0, limit as isize)
            .await?;
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for project_id in &due {
            pipe.zrem(key, project_id);
        }
        let removed: Vec<i64> = pipe.query_async(&mut conn).await?;

        Ok(due
            .into_iter()
            .zip(removed)
            .filter(|(_, count)| *count > 0)
            .map(|(id, _)| id)
            .collect())
    }

    // =========================================================================
    // Adaptive backoff (interval store)
    // =========================================================================

    /// Current full-check interval for a project, in hours.
    pub async fn get_check_interval(&self, project_id: &str) -> SchedulerResult<i64> {
        let mut conn = self.conn.clone();
        let stored: Option<String> = conn.hget(self.key(INTERVALS_KEY), project_id).await?;
        Ok(stored
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.default_interval_hours))
    }

    /// Store a project's interval, clamped to the configured bounds.
    pub async fn set_check_interval(&self, project_id: &str, hours: i64) -> SchedulerResult<()> {
        let clamped = hours.clamp(self.min_interval_hours, self.max_interval_hours);
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(self.key(INTERVALS_KEY), project_id, clamped)
            .await?;
        Ok(())
    }

    /// Apply one backoff step and return the new interval in hours.
    pub async fn apply_backoff(&self, project_id: &str, changed: bool) -> SchedulerResult<i64> {
        let current = self.get_check_interval(project_id).await?;
        let new_interval = next_interval(
            current,
            changed,
            self.min_interval_hours,
            self.max_interval_hours,
        );
        self.set_check_interval(project_id, new_interval).await?;
        info!(project_id, current, new_interval, changed, "applied backoff");
        Ok(new_interval)
    }

    // =========================================================================
    // Cooldowns
    // =========================================================================

    /// Put a project in cooldown: rescrape triggers are suppressed until
    /// the expiry. `None` uses the configured default.
    pub async fn set_cooldown(
        &self,
        project_id: &str,
        hours: Option<i64>,
    ) -> SchedulerResult<DateTime<Utc>> {
        let hours = hours.unwrap_or(self.cooldown_hours);
        let expires_at = Utc::now() + Duration::hours(hours);

        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(
                self.key(COOLDOWN_KEY),
                project_id,
                expires_at.timestamp_millis() as f64 / 1000.0,
            )
            .await?;
        Ok(expires_at)
    }

    /// Whether a project is currently in cooldown. Expired entries are
    /// evicted lazily on read.
    pub async fn is_in_cooldown(&self, project_id: &str) -> SchedulerResult<bool> {
        Ok(self.cooldown_remaining_hours(project_id).await?.is_some())
    }

    /// Hours of cooldown remaining, `None` when not in cooldown.
    pub async fn cooldown_remaining_hours(&self, project_id: &str) -> SchedulerResult<Option<f64>> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = conn.zscore(self.key(COOLDOWN_KEY), project_id).await?;
        let Some(expires) = score else {
            return Ok(None);
        };

        let remaining = expires - Self::now_epoch();
        if remaining <= 0.0 {
            let _: i64 = conn.zrem(self.key(COOLDOWN_KEY), project_id).await?;
            return Ok(None);
        }
        Ok(Some(remaining / 3600.0))
    }

    /// Remove a project's cooldown. Idempotent.
    pub async fn clear_cooldown(&self, project_id: &str) -> SchedulerResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.zrem(self.key(COOLDOWN_KEY), project_id).await?;
        Ok(())
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Enroll a project in both timers. Call after the initial crawl
    /// succeeds or when a project is re-enabled.
    pub async fn schedule_project(&self, project_id: &str) -> SchedulerResult<ScheduledTimes> {
        let full_check_at = self.schedule_full_check(project_id, None, None).await?;
        let lightweight_check_at = self.schedule_lightweight_check(project_id, None).await?;

        Ok(ScheduledTimes {
            project_id: project_id.to_string(),
            full_check_at,
            lightweight_check_at,
        })
    }

    /// Remove a project from every scheduler key in one pipelined round
    /// trip. Call on project deletion.
    pub async fn unschedule_project(&self, project_id: &str) -> SchedulerResult<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.zrem(self.key(FULL_CHECK_KEY), project_id).ignore();
        pipe.zrem(self.key(LIGHTWEIGHT_CHECK_KEY), project_id).ignore();
        pipe.zrem(self.key(COOLDOWN_KEY), project_id).ignore();
        pipe.hdel(self.key(INTERVALS_KEY), project_id).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        info!(project_id, "unscheduled project");
        Ok(())
    }

    /// Queue depths and due counts for operator observability.
    pub async fn stats(&self) -> SchedulerResult<ScheduleStats> {
        let mut conn = self.conn.clone();
        let now = Self::now_epoch();

        let full_due: u64 = conn
            .zcount(self.key(FULL_CHECK_KEY), f64::NEG_INFINITY, now)
            .await?;
        let full_scheduled: u64 = conn.zcard(self.key(FULL_CHECK_KEY)).await?;
        let lightweight_due: u64 = conn
            .zcount(self.key(LIGHTWEIGHT_CHECK_KEY), f64::NEG_INFINITY, now)
            .await?;
        let lightweight_scheduled: u64 = conn.zcard(self.key(LIGHTWEIGHT_CHECK_KEY)).await?;
        let cooldowns_active: u64 = conn.zcount(self.key(COOLDOWN_KEY), now, f64::INFINITY).await?;
        let intervals_stored: u64 = conn.hlen(self.key(INTERVALS_KEY)).await?;

        Ok(ScheduleStats {
            full_due,
            full_scheduled,
            lightweight_due,
            lightweight_scheduled,
            cooldowns_active,
            intervals_stored,
        })
    }
}
