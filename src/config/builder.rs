//! Builder for [`Settings`] with invariant validation.

use thiserror::Error;

use super::types::Settings;

/// Errors produced when building invalid settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("min_check_interval_hours ({min}) must not exceed max_check_interval_hours ({max})")]
    IntervalBoundsInverted { min: i64, max: i64 },

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("{field} is a percentage and must be <= 100 (got {value})")]
    PercentOutOfRange { field: &'static str, value: u8 },
}

/// Fluent builder over [`Settings`].
///
/// Starts from defaults; every setter overrides one field. `build()`
/// validates cross-field invariants and clamps nothing silently.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    inner: Settings,
}

impl SettingsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.inner.database_url = url.into();
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.inner.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.inner.user_agent = ua.into();
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.inner.request_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_pages_per_crawl(mut self, n: usize) -> Self {
        self.inner.max_pages_per_crawl = n;
        self
    }

    #[must_use]
    pub fn default_check_interval_hours(mut self, hours: i64) -> Self {
        self.inner.default_check_interval_hours = hours;
        self
    }

    #[must_use]
    pub fn min_check_interval_hours(mut self, hours: i64) -> Self {
        self.inner.min_check_interval_hours = hours;
        self
    }

    #[must_use]
    pub fn max_check_interval_hours(mut self, hours: i64) -> Self {
        self.inner.max_check_interval_hours = hours;
        self
    }

    #[must_use]
    pub fn full_rescrape_cooldown_hours(mut self, hours: i64) -> Self {
        self.inner.full_rescrape_cooldown_hours = hours;
        self
    }

    #[must_use]
    pub fn lightweight_check_interval_minutes(mut self, minutes: i64) -> Self {
        self.inner.lightweight_check_interval_minutes = minutes;
        self
    }

    #[must_use]
    pub fn lightweight_concurrent_requests(mut self, n: usize) -> Self {
        self.inner.lightweight_concurrent_requests = n;
        self
    }

    #[must_use]
    pub fn lightweight_request_delay_ms(mut self, ms: u64) -> Self {
        self.inner.lightweight_request_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn lightweight_change_threshold_percent(mut self, pct: u8) -> Self {
        self.inner.lightweight_change_threshold_percent = pct;
        self
    }

    #[must_use]
    pub fn lightweight_significance_threshold(mut self, threshold: u8) -> Self {
        self.inner.lightweight_significance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn relevance_batch_size(mut self, n: usize) -> Self {
        self.inner.relevance_batch_size = n;
        self
    }

    #[must_use]
    pub fn significance_batch_size(mut self, n: usize) -> Self {
        self.inner.significance_batch_size = n;
        self
    }

    /// Validate cross-field invariants and produce the settings.
    pub fn build(self) -> Result<Settings, SettingsError> {
        let s = self.inner;

        if s.min_check_interval_hours <= 0 {
            return Err(SettingsError::NonPositive {
                field: "min_check_interval_hours",
            });
        }
        if s.full_rescrape_cooldown_hours <= 0 {
            return Err(SettingsError::NonPositive {
                field: "full_rescrape_cooldown_hours",
            });
        }
        if s.lightweight_check_interval_minutes <= 0 {
            return Err(SettingsError::NonPositive {
                field: "lightweight_check_interval_minutes",
            });
        }
        if s.lightweight_concurrent_requests == 0 {
            return Err(SettingsError::NonPositive {
                field: "lightweight_concurrent_requests",
            });
        }
        if s.min_check_interval_hours > s.max_check_interval_hours {
            return Err(SettingsError::IntervalBoundsInverted {
                min: s.min_check_interval_hours,
                max: s.max_check_interval_hours,
            });
        }
        if s.lightweight_change_threshold_percent > 100 {
            return Err(SettingsError::PercentOutOfRange {
                field: "lightweight_change_threshold_percent",
                value: s.lightweight_change_threshold_percent,
            });
        }
        if s.lightweight_significance_threshold > 100 {
            return Err(SettingsError::PercentOutOfRange {
                field: "lightweight_significance_threshold",
                value: s.lightweight_significance_threshold,
            });
        }

        Ok(s)
    }
}
