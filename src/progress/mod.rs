//! Ephemeral per-project progress telemetry.
//!
//! Stage/percent/ETA records live in Redis with a one-hour TTL and are
//! overwritten on every update. This is not authoritative state: a failed
//! write is logged and swallowed so telemetry can never fail a task.

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Progress records expire after an hour.
const PROGRESS_TTL_SECS: u64 = 3600;

/// Pipeline stage being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Crawl,
    Filter,
    Curate,
    Generate,
    Analyze,
    Complete,
}

/// One progress snapshot as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub stage: Stage,
    pub current: u64,
    pub total: u64,
    pub percent: f64,
    pub elapsed_seconds: f64,
    pub eta_seconds: Option<f64>,
    pub current_url: Option<String>,
    pub extra: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Writes and reads progress snapshots for the surrounding API to poll.
#[derive(Clone)]
pub struct ProgressTracker {
    conn: ConnectionManager,
    namespace: String,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            namespace: String::new(),
        }
    }

    /// Prefix keys for test isolation on a shared Redis.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn key(&self, project_id: &str) -> String {
        if self.namespace.is_empty() {
            format!("crawl_progress:{project_id}")
        } else {
            format!("{}:crawl_progress:{project_id}", self.namespace)
        }
    }

    /// Overwrite the progress snapshot for a project.
    ///
    /// The ETA is derived from the observed rate: `(total - current) /
    /// (current / elapsed)`, reported only while the rate is positive.
    /// Best-effort: storage failures are logged, never surfaced.
    pub async fn update(
        &self,
        project_id: &str,
        stage: Stage,
        current: u64,
        total: u64,
        elapsed_seconds: f64,
        current_url: Option<&str>,
        extra: Option<&str>,
    ) {
        let percent = if total > 0 {
            (current as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let eta_seconds = if current > 0 && total > current && elapsed_seconds > 0.0 {
            let rate = current as f64 / elapsed_seconds;
            (rate > 0.0).then(|| ((total - current) as f64 / rate * 10.0).round() / 10.0)
        } else {
            None
        };

        let record = ProgressRecord {
            stage,
            current,
            total,
            percent,
            elapsed_seconds: (elapsed_seconds * 10.0).round() / 10.0,
            eta_seconds,
            current_url: current_url.map(String::from),
            extra: extra.map(String::from),
            updated_at: Utc::now(),
        };

        let payload = match serde_json::to_string(&record) {
            Ok(p) => p,
            Err(err) => {
                warn!(project_id, error = %err, "failed to serialize progress record");
                return;
            }
        };

        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = conn
            .set_ex(self.key(project_id), payload, PROGRESS_TTL_SECS)
            .await;
        if let Err(err) = result {
            warn!(project_id, error = %err, "failed to write progress record");
        } else {
            debug!(project_id, ?stage, current, total, "progress updated");
        }
    }

    /// Read the current snapshot, if one is stored and unexpired.
    pub async fn get(&self, project_id: &str) -> Option<ProgressRecord> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(self.key(project_id)).await {
            Ok(v) => v,
            Err(err) => {
                warn!(project_id, error = %err, "failed to read progress record");
                return None;
            }
        };
        raw.and_then(|json| serde_json::from_str(&json).ok())
    }

    /// Drop the snapshot for a project.
    pub async fn clear(&self, project_id: &str) {
        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = conn.del(self.key(project_id)).await;
        if let Err(err) = result {
            warn!(project_id, error = %err, "failed to clear progress record");
        }
    }
}
