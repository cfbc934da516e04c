//! Selective-regeneration planner.
//!
//! After a full crawl, decides the minimum work needed to bring the
//! artifact up to date: full regeneration, a per-section patch, or nothing.
//! The thresholds exist to prevent churn; a site must move substantially
//! before the whole artifact is rebuilt, and an insignificant edit must not
//! touch any section at all.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::merger::{assemble_artifact, compute_section_hash};
use crate::providers::{
    filter_relevant_pages, Crawler, CuratedPageData, LlmCurator, PageCategorization, PageChange,
    PageRecord, ProviderError, SectionOutcome, SiteContext,
};
use crate::repository::{
    CuratedSectionRow, InventoryDiff, Project, RepositoryError, Store, TriggerReason,
};
use crate::utils::normalize_url;

/// Characters of fresh markdown handed to the significance provider.
const MARKDOWN_PREFIX_CHARS: usize = 1000;

/// Errors from planning or execution.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Provider failure on a call with no safe fallback (full curation).
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Which threshold rule forced full regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FullRegenReason {
    /// R1: more than half the curated URLs disappeared.
    MajorRestructure,
    /// R2: more than half the curated URLs changed significantly.
    MajorContentOverhaul,
    /// R3: relevant new URLs exceed 30% of the curated set.
    MajorExpansion,
    /// R4: as many new sections proposed as currently exist.
    SitePivot,
    /// No curated state exists yet; everything must be built.
    MissingCuratedState,
}

/// The planner's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    FullRegeneration(FullRegenReason),
    Selective,
    NoOp,
}

/// Inputs to the full-regeneration threshold check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdInputs {
    pub curated_count: usize,
    pub removed_from_site: usize,
    pub significant_changes: usize,
    pub new_relevant: usize,
    pub new_sections: usize,
    pub existing_sections: usize,
}

/// Evaluate rules R1-R4. Each rule independently forces full regeneration.
#[must_use]
pub fn evaluate_thresholds(inputs: &ThresholdInputs) -> Option<FullRegenReason> {
    if inputs.curated_count > 0 {
        let curated = inputs.curated_count as f64;
        if inputs.removed_from_site as f64 / curated > 0.5 {
            return Some(FullRegenReason::MajorRestructure);
        }
        if inputs.significant_changes as f64 / curated > 0.5 {
            return Some(FullRegenReason::MajorContentOverhaul);
        }
        if inputs.new_relevant as f64 / curated > 0.3 {
            return Some(FullRegenReason::MajorExpansion);
        }
    }
    if inputs.new_sections > 0
        && inputs.existing_sections > 0
        && inputs.new_sections >= inputs.existing_sections
    {
        return Some(FullRegenReason::SitePivot);
    }
    None
}

/// Sections touched by this crawl: any section holding a removed URL, a
/// significantly changed URL, or targeted by a newly categorized page.
#[must_use]
pub fn compute_affected_sections(
    sections: &[CuratedSectionRow],
    category_by_url: &HashMap<String, String>,
    removed: &HashSet<String>,
    significant: &HashSet<String>,
    new_target_categories: &HashSet<String>,
) -> BTreeSet<String> {
    let mut affected = BTreeSet::new();

    for section in sections {
        let holds_removed = section.page_urls.iter().any(|u| removed.contains(u));
        let holds_significant = section.page_urls.iter().any(|u| significant.contains(u));
        if holds_removed || holds_significant || new_target_categories.contains(&section.name) {
            affected.insert(section.name.clone());
        }
    }

    // Curated pages whose section row lost track of them still pull their
    // category in via the URL → category map.
    for url in removed.iter().chain(significant.iter()) {
        if let Some(category) = category_by_url.get(url) {
            if sections.iter().any(|s| &s.name == category) {
                affected.insert(category.clone());
            }
        }
    }

    affected
}

/// The full plan for one crawl, produced by [`Planner::plan`].
#[derive(Debug, Clone)]
pub struct RegenerationPlan {
    pub decision: PlanDecision,
    pub inventory: InventoryDiff,
    /// Curated URLs that disappeared from the site.
    pub removed_from_site: Vec<String>,
    /// Curated URLs whose fresh content hash differs from the stored one.
    pub hash_mismatch: Vec<String>,
    /// The subset of `hash_mismatch` the provider judged meaningful.
    pub significant_changes: Vec<String>,
    /// Relevant new pages, homepage always included when new.
    pub new_relevant: Vec<PageRecord>,
    /// Section assignments for the new pages.
    pub categorization: PageCategorization,
    pub affected_sections: BTreeSet<String>,
}

/// Result of executing a plan.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Whether curated state or the artifact was modified. Drives backoff.
    pub did_work: bool,
    pub artifact_version: Option<i64>,
    pub sections_regenerated: Vec<String>,
    pub sections_deleted: Vec<String>,
}

/// Plans and executes artifact regeneration for one project.
pub struct Planner<'a> {
    store: &'a Store,
    crawler: &'a dyn Crawler,
    curator: &'a dyn LlmCurator,
    settings: &'a Settings,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub fn new(
        store: &'a Store,
        crawler: &'a dyn Crawler,
        curator: &'a dyn LlmCurator,
        settings: &'a Settings,
    ) -> Self {
        Self {
            store,
            crawler,
            curator,
            settings,
        }
    }

    /// Stages A-F: classify the crawl against stored curated state.
    pub async fn plan(
        &self,
        project: &Project,
        crawl: &[PageRecord],
    ) -> Result<RegenerationPlan, PlanError> {
        // Stage A: URL inventory diff. Prefer the fast site map; fall back
        // to the crawl's own URL set.
        let mapped_urls = match self.crawler.map_site(&project.url).await {
            Ok(urls) if !urls.is_empty() => urls,
            Ok(_) => crawl.iter().map(|p| p.url.clone()).collect(),
            Err(err) => {
                warn!(project_id = %project.id, error = %err, "site map failed, using crawl URLs");
                crawl.iter().map(|p| p.url.clone()).collect()
            }
        };
        let inventory = self.store.store_inventory(&project.id, &mapped_urls).await?;

        // Stage B: curated partition.
        let curated_pages = self.store.get_curated_pages(&project.id).await?;
        let sections = self.store.get_curated_sections(&project.id).await?;

        if curated_pages.is_empty() || sections.is_empty() {
            return Ok(RegenerationPlan {
                decision: PlanDecision::FullRegeneration(FullRegenReason::MissingCuratedState),
                inventory,
                removed_from_site: Vec::new(),
                hash_mismatch: Vec::new(),
                significant_changes: Vec::new(),
                new_relevant: Vec::new(),
                categorization: PageCategorization::default(),
                affected_sections: BTreeSet::new(),
            });
        }

        let curated_urls: HashSet<String> =
            curated_pages.iter().map(|p| p.url.clone()).collect();
        let removed_set: HashSet<String> = inventory.removed_urls.iter().cloned().collect();

        let removed_from_site: Vec<String> = curated_urls
            .intersection(&removed_set)
            .cloned()
            .collect();

        let fresh_by_url: HashMap<String, &PageRecord> = crawl
            .iter()
            .map(|p| (normalize_url(&p.url), p))
            .collect();

        let hash_mismatch: Vec<String> = curated_pages
            .iter()
            .filter(|p| !removed_set.contains(&p.url))
            .filter(|p| {
                fresh_by_url
                    .get(&p.url)
                    .is_some_and(|fresh| fresh.content_hash != p.content_hash)
            })
            .map(|p| p.url.clone())
            .collect();

        // Stage C: semantic filter on the mismatches.
        let significant_changes = self
            .filter_significant(&curated_pages, &hash_mismatch, &fresh_by_url)
            .await;

        // Stage D: relevance + categorization of truly new URLs.
        let new_records: Vec<PageRecord> = inventory
            .new_urls
            .iter()
            .filter_map(|url| fresh_by_url.get(url).map(|p| (*p).clone()))
            .collect();
        let new_relevant =
            filter_relevant_pages(self.curator, &new_records, self.settings.relevance_batch_size)
                .await;

        let site_context = self.site_context(project).await?;
        let existing_names: Vec<String> = sections.iter().map(|s| s.name.clone()).collect();
        let categorization = if new_relevant.is_empty() {
            PageCategorization::default()
        } else {
            match self
                .curator
                .categorize_new_pages(&new_relevant, &site_context, &existing_names)
                .await
            {
                Ok(c) => c,
                Err(err) => {
                    // Safe default: everything lands in "Other", no new
                    // sections proposed.
                    warn!(project_id = %project.id, error = %err, "categorization failed, assigning to Other");
                    PageCategorization {
                        pages: new_relevant
                            .iter()
                            .map(|p| CuratedPageData {
                                url: p.url.clone(),
                                title: p.title.clone(),
                                description: p.description.clone().unwrap_or_default(),
                                category: "Other".to_string(),
                            })
                            .collect(),
                        new_sections_needed: Vec::new(),
                    }
                }
            }
        };

        // Stage E: full-regeneration thresholds.
        let inputs = ThresholdInputs {
            curated_count: curated_pages.len(),
            removed_from_site: removed_from_site.len(),
            significant_changes: significant_changes.len(),
            new_relevant: new_relevant.len(),
            new_sections: categorization.new_sections_needed.len(),
            existing_sections: sections.len(),
        };

        let decision = match evaluate_thresholds(&inputs) {
            Some(reason) => PlanDecision::FullRegeneration(reason),
            None => {
                if removed_from_site.is_empty()
                    && significant_changes.is_empty()
                    && new_relevant.is_empty()
                {
                    PlanDecision::NoOp
                } else {
                    PlanDecision::Selective
                }
            }
        };

        // Stage F: affected sections for the selective path.
        let category_by_url: HashMap<String, String> = curated_pages
            .iter()
            .map(|p| (p.url.clone(), p.category.clone()))
            .collect();
        let new_target_categories: HashSet<String> = categorization
            .pages
            .iter()
            .map(|p| p.category.clone())
            .chain(categorization.new_sections_needed.iter().cloned())
            .collect();

        let affected_sections = compute_affected_sections(
            &sections,
            &category_by_url,
            &removed_from_site.iter().cloned().collect(),
            &significant_changes.iter().cloned().collect(),
            &new_target_categories,
        );

        info!(
            project_id = %project.id,
            ?decision,
            removed = removed_from_site.len(),
            mismatched = hash_mismatch.len(),
            significant = significant_changes.len(),
            new_relevant = new_relevant.len(),
            affected = affected_sections.len(),
            "crawl classified"
        );

        Ok(RegenerationPlan {
            decision,
            inventory,
            removed_from_site,
            hash_mismatch,
            significant_changes,
            new_relevant,
            categorization,
            affected_sections,
        })
    }

    /// Stage C: batched provider calls over the hash mismatches. A failed
    /// batch assumes every change in it is significant (safe default).
    async fn filter_significant(
        &self,
        curated_pages: &[crate::repository::CuratedPageRow],
        hash_mismatch: &[String],
        fresh_by_url: &HashMap<String, &PageRecord>,
    ) -> Vec<String> {
        if hash_mismatch.is_empty() {
            return Vec::new();
        }

        let description_by_url: HashMap<&str, &str> = curated_pages
            .iter()
            .map(|p| (p.url.as_str(), p.description.as_str()))
            .collect();

        let changes: Vec<PageChange> = hash_mismatch
            .iter()
            .map(|url| PageChange {
                url: url.clone(),
                old_description: description_by_url.get(url.as_str()).unwrap_or(&"").to_string(),
                new_markdown_prefix: fresh_by_url
                    .get(url)
                    .map(|p| p.markdown.chars().take(MARKDOWN_PREFIX_CHARS).collect())
                    .unwrap_or_default(),
            })
            .collect();

        let mut significant = Vec::new();
        let batch_size = self.settings.significance_batch_size.max(1);
        for batch in changes.chunks(batch_size) {
            match self.curator.evaluate_semantic_significance(batch).await {
                Ok(verdict) => {
                    for change in batch {
                        if verdict.significant_urls.iter().any(|u| u == &change.url) {
                            significant.push(change.url.clone());
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "significance batch failed, assuming significant");
                    significant.extend(batch.iter().map(|c| c.url.clone()));
                }
            }
        }
        significant
    }

    async fn site_context(&self, project: &Project) -> Result<SiteContext, PlanError> {
        Ok(match self.store.get_site_overview(&project.id).await? {
            Some(overview) => SiteContext {
                site_title: overview.site_title,
                tagline: overview.tagline,
            },
            None => SiteContext {
                site_title: project.name.clone(),
                tagline: String::new(),
            },
        })
    }

    /// Stage G: apply the plan.
    ///
    /// No-op keeps the current artifact untouched. Selective regenerates
    /// exactly the affected sections; full replaces everything. Returns
    /// whether work was done, which drives the backoff outcome bit.
    pub async fn execute(
        &self,
        project: &Project,
        plan: &RegenerationPlan,
        crawl: &[PageRecord],
        trigger: TriggerReason,
    ) -> Result<ExecutionOutcome, PlanError> {
        match plan.decision {
            PlanDecision::NoOp => Ok(ExecutionOutcome::default()),
            PlanDecision::FullRegeneration(reason) => {
                info!(project_id = %project.id, ?reason, "full regeneration");
                self.execute_full(project, crawl, trigger).await
            }
            PlanDecision::Selective => self.execute_selective(project, plan, crawl, trigger).await,
        }
    }

    async fn execute_full(
        &self,
        project: &Project,
        crawl: &[PageRecord],
        trigger: TriggerReason,
    ) -> Result<ExecutionOutcome, PlanError> {
        // Re-filter the whole crawl: relevance may have shifted with the
        // site's new shape.
        let relevant =
            filter_relevant_pages(self.curator, crawl, self.settings.relevance_batch_size).await;

        // Full curation has no safe fallback; a provider failure aborts.
        let curation = self.curator.curate_full(&relevant).await?;

        let page_hashes: HashMap<String, String> = crawl
            .iter()
            .map(|p| (normalize_url(&p.url), p.content_hash.clone()))
            .collect();
        let section_hashes: HashMap<String, String> = curation
            .sections
            .iter()
            .map(|s| {
                let urls: Vec<String> = s.pages.iter().map(|p| normalize_url(&p.url)).collect();
                (s.name.clone(), compute_section_hash(&page_hashes, &urls))
            })
            .collect();

        self.store
            .replace_curated_state(
                &project.id,
                &curation.site_title,
                &curation.tagline,
                &curation.overview,
                &curation.sections,
                &page_hashes,
                &section_hashes,
            )
            .await?;

        let version = self.write_artifact(project, trigger).await?;
        Ok(ExecutionOutcome {
            did_work: true,
            artifact_version: Some(version),
            sections_regenerated: curation.sections.iter().map(|s| s.name.clone()).collect(),
            sections_deleted: Vec::new(),
        })
    }

    async fn execute_selective(
        &self,
        project: &Project,
        plan: &RegenerationPlan,
        crawl: &[PageRecord],
        trigger: TriggerReason,
    ) -> Result<ExecutionOutcome, PlanError> {
        let site_context = self.site_context(project).await?;
        let fresh_by_url: HashMap<String, &PageRecord> = crawl
            .iter()
            .map(|p| (normalize_url(&p.url), p))
            .collect();
        let page_hashes: HashMap<String, String> = crawl
            .iter()
            .map(|p| (normalize_url(&p.url), p.content_hash.clone()))
            .collect();
        let removed: HashSet<&String> = plan.removed_from_site.iter().collect();

        // New sections proposed by categorization start empty and receive
        // their members below.
        for name in &plan.categorization.new_sections_needed {
            self.store
                .upsert_curated_section(&project.id, name, "", &[], "")
                .await?;
        }

        // Curated-page bookkeeping: drop removed, refresh changed, insert new.
        self.store
            .delete_curated_pages(&project.id, &plan.removed_from_site)
            .await?;

        let existing = self.store.get_curated_pages(&project.id).await?;
        for url in &plan.significant_changes {
            if let Some(fresh) = fresh_by_url.get(url) {
                if let Some(current) = existing.iter().find(|p| &p.url == url) {
                    let updated = CuratedPageData {
                        url: url.clone(),
                        title: fresh.title.clone(),
                        description: current.description.clone(),
                        category: current.category.clone(),
                    };
                    self.store
                        .upsert_curated_page(&project.id, &updated, &fresh.content_hash)
                        .await?;
                }
            }
        }

        for page in &plan.categorization.pages {
            let url = normalize_url(&page.url);
            let content_hash = page_hashes.get(&url).cloned().unwrap_or_default();
            self.store
                .upsert_curated_page(&project.id, page, &content_hash)
                .await?;
        }

        // Regenerate each affected section's prose.
        let mut outcome = ExecutionOutcome {
            did_work: true,
            ..Default::default()
        };

        let sections = self.store.get_curated_sections(&project.id).await?;
        for section in sections
            .iter()
            .filter(|s| plan.affected_sections.contains(&s.name)
                || plan.categorization.new_sections_needed.contains(&s.name))
        {
            // Membership after this crawl: previous URLs minus removed,
            // plus newly assigned ones.
            let mut member_urls: Vec<String> = section
                .page_urls
                .iter()
                .filter(|u| !removed.contains(u))
                .cloned()
                .collect();
            for page in &plan.categorization.pages {
                let url = normalize_url(&page.url);
                if page.category == section.name && !member_urls.contains(&url) {
                    member_urls.push(url);
                }
            }

            let member_records: Vec<PageRecord> = member_urls
                .iter()
                .filter_map(|u| fresh_by_url.get(u).map(|p| (*p).clone()))
                .collect();

            let result = self
                .curator
                .regenerate_section(&section.name, &member_records, &site_context)
                .await;

            match result {
                Ok(SectionOutcome::Keep { description }) => {
                    let section_hash = compute_section_hash(&page_hashes, &member_urls);
                    self.store
                        .upsert_curated_section(
                            &project.id,
                            &section.name,
                            &description,
                            &member_urls,
                            &section_hash,
                        )
                        .await?;
                    outcome.sections_regenerated.push(section.name.clone());
                }
                Ok(SectionOutcome::Delete { reason }) => {
                    info!(project_id = %project.id, section = %section.name, %reason, "section deleted");
                    self.store
                        .delete_curated_section(&project.id, &section.name)
                        .await?;
                    let orphans: Vec<String> = self
                        .store
                        .get_curated_pages(&project.id)
                        .await?
                        .into_iter()
                        .filter(|p| p.category == section.name)
                        .map(|p| p.url)
                        .collect();
                    self.store.delete_curated_pages(&project.id, &orphans).await?;
                    outcome.sections_deleted.push(section.name.clone());
                }
                Err(err) => {
                    // Safe default: keep the existing prose, refresh only
                    // the membership hash.
                    warn!(project_id = %project.id, section = %section.name, error = %err,
                          "section regeneration failed, keeping existing prose");
                    let section_hash = compute_section_hash(&page_hashes, &member_urls);
                    self.store
                        .upsert_curated_section(
                            &project.id,
                            &section.name,
                            &section.description,
                            &member_urls,
                            &section_hash,
                        )
                        .await?;
                }
            }
        }

        let version = self.write_artifact(project, trigger).await?;
        outcome.artifact_version = Some(version);
        Ok(outcome)
    }

    /// Rebuild the artifact from stored rows and record a new version.
    async fn write_artifact(
        &self,
        project: &Project,
        trigger: TriggerReason,
    ) -> Result<i64, PlanError> {
        let overview = self
            .store
            .get_site_overview(&project.id)
            .await?
            .ok_or(RepositoryError::NotFound {
                what: "site overview",
            })?;
        let sections = self.store.get_curated_sections(&project.id).await?;
        let pages = self.store.get_curated_pages(&project.id).await?;

        let assembled = assemble_artifact(&overview, &sections, &pages, &project.url);
        let version = self
            .store
            .save_artifact(&project.id, &assembled.content, &assembled.content_hash, trigger)
            .await?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn inputs() -> ThresholdInputs {
        ThresholdInputs {
            curated_count: 10,
            existing_sections: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_rule_fires_when_quiet() {
        assert_eq!(evaluate_thresholds(&inputs()), None);
    }

    #[test]
    fn test_r1_removal_ratio() {
        let mut i = inputs();
        i.removed_from_site = 6; // 60% > 50%
        assert_eq!(
            evaluate_thresholds(&i),
            Some(FullRegenReason::MajorRestructure)
        );
        i.removed_from_site = 5; // exactly 50% does not fire
        assert_eq!(evaluate_thresholds(&i), None);
    }

    #[test]
    fn test_r2_significant_ratio() {
        let mut i = inputs();
        i.significant_changes = 6;
        assert_eq!(
            evaluate_thresholds(&i),
            Some(FullRegenReason::MajorContentOverhaul)
        );
    }

    #[test]
    fn test_r3_new_ratio() {
        let mut i = inputs();
        i.new_relevant = 4; // 40% > 30%
        assert_eq!(evaluate_thresholds(&i), Some(FullRegenReason::MajorExpansion));
        i.new_relevant = 3; // exactly 30% does not fire
        assert_eq!(evaluate_thresholds(&i), None);
    }

    #[test]
    fn test_r4_site_pivot() {
        let mut i = inputs();
        i.new_sections = 4; // equals existing
        assert_eq!(evaluate_thresholds(&i), Some(FullRegenReason::SitePivot));
        i.new_sections = 3;
        assert_eq!(evaluate_thresholds(&i), None);
    }

    #[test]
    fn test_r4_requires_both_nonzero() {
        let i = ThresholdInputs {
            curated_count: 10,
            new_sections: 0,
            existing_sections: 0,
            ..Default::default()
        };
        assert_eq!(evaluate_thresholds(&i), None);
    }

    #[test]
    fn test_rules_fire_independently() {
        // R3 fires even with zero removals and zero significant changes.
        let i = ThresholdInputs {
            curated_count: 10,
            new_relevant: 9,
            existing_sections: 2,
            ..Default::default()
        };
        assert_eq!(evaluate_thresholds(&i), Some(FullRegenReason::MajorExpansion));
    }

    fn section_row(name: &str, urls: &[&str]) -> CuratedSectionRow {
        CuratedSectionRow {
            id: format!("s-{name}"),
            project_id: "p".into(),
            name: name.into(),
            description: String::new(),
            page_urls: urls.iter().map(|u| u.to_string()).collect(),
            content_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_affected_sections_by_membership() {
        let sections = vec![
            section_row("Resources", &["https://a.com/docs"]),
            section_row("Pricing", &["https://a.com/pricing"]),
        ];
        let affected = compute_affected_sections(
            &sections,
            &HashMap::new(),
            &HashSet::new(),
            &HashSet::from(["https://a.com/docs".to_string()]),
            &HashSet::new(),
        );
        assert_eq!(affected, BTreeSet::from(["Resources".to_string()]));
    }

    #[test]
    fn test_affected_sections_by_new_category() {
        let sections = vec![
            section_row("Resources", &[]),
            section_row("Company", &[]),
        ];
        let affected = compute_affected_sections(
            &sections,
            &HashMap::new(),
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::from(["Company".to_string()]),
        );
        assert_eq!(affected, BTreeSet::from(["Company".to_string()]));
    }

    #[test]
    fn test_affected_sections_via_category_map() {
        // The section row lost track of the URL but the curated page still
        // carries its category.
        let sections = vec![section_row("Resources", &[])];
        let category_by_url =
            HashMap::from(["https://a.com/guide".to_string()].map(|u| (u, "Resources".to_string())));
        let affected = compute_affected_sections(
            &sections,
            &category_by_url,
            &HashSet::from(["https://a.com/guide".to_string()]),
            &HashSet::new(),
            &HashSet::new(),
        );
        assert_eq!(affected, BTreeSet::from(["Resources".to_string()]));
    }
}
