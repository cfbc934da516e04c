//! sitepulse: two-tier website change detection with selective
//! regeneration of a derived site-summary artifact.
//!
//! The cheap tier probes every tracked page with conditional HEAD requests
//! on a fixed cadence; the heavy tier recrawls a site on an adaptive
//! interval and patches only the affected sections of the artifact.
//! Scheduling state lives in Redis sorted sets, durable state in SQLite,
//! and the crawler and language-model curator are injected behind traits.

pub mod analyzer;
pub mod checker;
pub mod config;
pub mod extractor;
pub mod merger;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod providers;
pub mod repository;
pub mod scheduler;
pub mod tasks;
pub mod utils;

pub use analyzer::{BatchSignificance, ChangeAnalyzer, ChangedPage, SignificanceReason};
pub use checker::{CheckOutcome, CheckReport, LightweightChecker, TriggerOutcome, TriggerResult};
pub use config::{Settings, SettingsBuilder};
pub use extractor::{extract_content, extract_fingerprint};
pub use merger::{assemble_artifact, compute_section_hash, parse_artifact, SECTION_ORDER};
pub use planner::{
    evaluate_thresholds, ExecutionOutcome, FullRegenReason, PlanDecision, Planner,
    RegenerationPlan, ThresholdInputs,
};
pub use probe::{
    ChangeReason, FingerprintProbe, ObservedFingerprint, ProbeOutcome, ProbeResult,
    StoredFingerprint,
};
pub use progress::{ProgressRecord, ProgressTracker, Stage};
pub use providers::{
    Crawler, CuratedPageData, FullCuration, LlmCurator, PageCategorization, PageChange,
    PageRecord, ProviderError, RelevanceVerdict, SectionData, SectionOutcome,
    SignificanceVerdict, SiteContext,
};
pub use repository::{
    ArtifactRow, ArtifactVersionRow, CrawlJobRow, CuratedPageRow, CuratedSectionRow, JobStatus,
    NewPage, PageRow, Project, ProjectStatus, RepositoryError, Store, TriggerReason,
};
pub use scheduler::{next_interval, ScheduleStats, ScheduledTimes, Scheduler, SchedulerError};
pub use tasks::{
    run_full_rescrape, run_initial_crawl, run_lightweight_check, TaskContext, TaskReport,
    TaskStatus,
};
pub use utils::{is_homepage_url, is_valid_url, normalize_url};
