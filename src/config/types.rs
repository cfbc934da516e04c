//! Core settings struct with deployment defaults.

use serde::{Deserialize, Serialize};

use super::builder::SettingsBuilder;

/// Process-wide settings.
///
/// Every tunable the change-detection core uses lives here, with defaults
/// matching the deployed behavior. Construct via [`Settings::builder`] (which
/// validates), [`Settings::default`], or [`Settings::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite connection URL for the relational store.
    pub database_url: String,
    /// Redis connection URL for scheduler state and progress telemetry.
    pub redis_url: String,

    /// User-Agent sent by the fingerprint probe.
    pub user_agent: String,
    /// Per-request timeout for probe HEAD/GET calls, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum pages fetched per full crawl.
    pub max_pages_per_crawl: usize,

    // Full-check timer (adaptive backoff)
    /// Interval used when a project has no stored interval yet.
    pub default_check_interval_hours: i64,
    /// Lower bound of the adaptive interval. A detected change resets to this.
    pub min_check_interval_hours: i64,
    /// Upper bound of the adaptive interval.
    pub max_check_interval_hours: i64,
    /// Quiet period after a triggered rescrape during which further triggers
    /// are suppressed regardless of signal strength.
    pub full_rescrape_cooldown_hours: i64,

    // Lightweight-check timer
    /// Fixed interval between lightweight HEAD sweeps per project.
    pub lightweight_check_interval_minutes: i64,
    /// Maximum concurrent HEAD requests per project sweep.
    pub lightweight_concurrent_requests: usize,
    /// Politeness delay between requests within a sweep, in milliseconds.
    pub lightweight_request_delay_ms: u64,
    /// Percentage of changed pages at which a sweep short-circuits into a
    /// rescrape without fetching bodies.
    pub lightweight_change_threshold_percent: u8,
    /// Mean drift score (0-100) at which cumulative changes count as
    /// significant.
    pub lightweight_significance_threshold: u8,

    // Task soft time limits (hard limit is 10% above)
    pub crawl_soft_time_limit_secs: u64,
    pub lightweight_soft_time_limit_secs: u64,
    pub dispatch_soft_time_limit_secs: u64,

    // Provider batching
    /// Pages per relevance-filter LLM request.
    pub relevance_batch_size: usize,
    /// Changed pages per semantic-significance LLM request.
    pub significance_batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://sitepulse.db?mode=rwc".to_string(),
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            user_agent: concat!("sitepulse/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            max_pages_per_crawl: 100,
            default_check_interval_hours: 24,
            min_check_interval_hours: 6,
            max_check_interval_hours: 168,
            full_rescrape_cooldown_hours: 4,
            lightweight_check_interval_minutes: 5,
            lightweight_concurrent_requests: 20,
            lightweight_request_delay_ms: 50,
            lightweight_change_threshold_percent: 20,
            lightweight_significance_threshold: 30,
            crawl_soft_time_limit_secs: 600,
            lightweight_soft_time_limit_secs: 120,
            dispatch_soft_time_limit_secs: 30,
            relevance_batch_size: 25,
            significance_batch_size: 10,
        }
    }
}

impl Settings {
    /// Start building settings with validation on `build()`.
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Load settings from `SITEPULSE_*` environment variables, falling back
    /// to defaults for anything unset.
    ///
    /// Only the connection URLs and the interval knobs are commonly
    /// overridden in deployments; everything else has stable defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut builder = Self::builder();

        if let Ok(v) = std::env::var("SITEPULSE_DATABASE_URL") {
            builder = builder.database_url(v);
        }
        if let Ok(v) = std::env::var("SITEPULSE_REDIS_URL") {
            builder = builder.redis_url(v);
        }
        if let Ok(v) = std::env::var("SITEPULSE_MIN_CHECK_INTERVAL_HOURS") {
            builder = builder.min_check_interval_hours(v.parse()?);
        }
        if let Ok(v) = std::env::var("SITEPULSE_MAX_CHECK_INTERVAL_HOURS") {
            builder = builder.max_check_interval_hours(v.parse()?);
        }
        if let Ok(v) = std::env::var("SITEPULSE_DEFAULT_CHECK_INTERVAL_HOURS") {
            builder = builder.default_check_interval_hours(v.parse()?);
        }
        if let Ok(v) = std::env::var("SITEPULSE_COOLDOWN_HOURS") {
            builder = builder.full_rescrape_cooldown_hours(v.parse()?);
        }
        if let Ok(v) = std::env::var("SITEPULSE_LIGHTWEIGHT_INTERVAL_MINUTES") {
            builder = builder.lightweight_check_interval_minutes(v.parse()?);
        }
        if let Ok(v) = std::env::var("SITEPULSE_MAX_PAGES_PER_CRAWL") {
            builder = builder.max_pages_per_crawl(v.parse()?);
        }

        builder.build().map_err(Into::into)
    }
}
