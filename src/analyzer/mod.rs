//! Heuristic change-significance analysis.
//!
//! Scores how far a page has drifted from its stored baseline without any
//! provider calls. The scoring is a deliberate heuristic: predictable,
//! explainable, and cheap enough to run on every changed page of a sweep.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Characters of each document sampled for the diff component.
const DIFF_SAMPLE_CHARS: usize = 10_000;

/// Component weights. They sum to 100; the total is clamped there anyway.
const DIFF_WEIGHT: f64 = 0.4;
const TITLE_POINTS: u32 = 20;
const NAV_POINTS: u32 = 25;
const LENGTH_POINTS: u32 = 15;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("TITLE_RE: hardcoded regex is valid")
});

static NAV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<nav[^>]*>(.*?)</nav>").expect("NAV_RE: hardcoded regex is valid")
});

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<header[^>]*>(.*?)</header>").expect("HEADER_RE: hardcoded regex is valid")
});

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href=["']([^"'#]+)["']"#).expect("HREF_RE: hardcoded regex is valid")
});

/// Why a batch was (or was not) judged significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceReason {
    NoChanges,
    BulkChange,
    CumulativeDrift,
    BelowThreshold,
}

/// One changed page awaiting drift scoring.
#[derive(Debug, Clone)]
pub struct ChangedPage {
    pub url: String,
    pub baseline_html: String,
    pub current_html: String,
}

/// Per-page drift score within a batch result.
#[derive(Debug, Clone, Serialize)]
pub struct PageScore {
    pub url: String,
    pub score: u8,
}

/// Aggregated significance verdict for a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSignificance {
    pub significant: bool,
    pub score: f64,
    pub reason: SignificanceReason,
    pub pages_analyzed: usize,
    pub page_scores: Vec<PageScore>,
}

/// Analyzes cumulative drift of changed pages against their baselines.
#[derive(Debug, Clone, Copy)]
pub struct ChangeAnalyzer {
    /// Mean page score (0-100) at which a batch counts as significant.
    significance_threshold: u8,
    /// Percentage of changed pages at which the batch is significant
    /// outright, with no per-page scoring.
    bulk_threshold_percent: u8,
}

impl ChangeAnalyzer {
    #[must_use]
    pub fn new(significance_threshold: u8, bulk_threshold_percent: u8) -> Self {
        Self {
            significance_threshold,
            bulk_threshold_percent,
        }
    }

    /// Aggregate significance of `changed` pages in a project of
    /// `total_pages`.
    ///
    /// Fast path first: if more than the bulk threshold of pages changed,
    /// the verdict is significant with score 100 and no page is scored
    /// individually.
    #[must_use]
    pub fn analyze_batch(&self, changed: &[ChangedPage], total_pages: usize) -> BatchSignificance {
        if changed.is_empty() {
            return BatchSignificance {
                significant: false,
                score: 0.0,
                reason: SignificanceReason::NoChanges,
                pages_analyzed: 0,
                page_scores: Vec::new(),
            };
        }

        let change_ratio = if total_pages > 0 {
            changed.len() as f64 / total_pages as f64
        } else {
            0.0
        };
        if change_ratio > f64::from(self.bulk_threshold_percent) / 100.0 {
            return BatchSignificance {
                significant: true,
                score: 100.0,
                reason: SignificanceReason::BulkChange,
                pages_analyzed: changed.len(),
                page_scores: Vec::new(),
            };
        }

        let page_scores: Vec<PageScore> = changed
            .iter()
            .map(|page| PageScore {
                url: page.url.clone(),
                score: score_page_drift(&page.baseline_html, &page.current_html),
            })
            .collect();

        let mean = page_scores.iter().map(|s| f64::from(s.score)).sum::<f64>()
            / page_scores.len() as f64;
        let significant = mean >= f64::from(self.significance_threshold);

        BatchSignificance {
            significant,
            score: (mean * 10.0).round() / 10.0,
            reason: if significant {
                SignificanceReason::CumulativeDrift
            } else {
                SignificanceReason::BelowThreshold
            },
            pages_analyzed: page_scores.len(),
            page_scores,
        }
    }
}

/// Score cumulative drift of one page from its baseline, 0-100.
///
/// Breakdown: diff percentage up to 40 points, title change 20, nav
/// structure change 25, content length delta over 30% another 15.
/// An empty baseline or current document scores 0; those cases are
/// handled upstream as first observations or fetch failures.
#[must_use]
pub fn score_page_drift(baseline_html: &str, current_html: &str) -> u8 {
    if baseline_html.is_empty() || current_html.is_empty() {
        return 0;
    }

    let mut score = 0.0f64;

    score += (diff_percentage(baseline_html, current_html) * DIFF_WEIGHT).min(40.0);

    if title_changed(baseline_html, current_html) {
        score += f64::from(TITLE_POINTS);
    }
    if nav_changed(baseline_html, current_html) {
        score += f64::from(NAV_POINTS);
    }
    if significant_length_change(baseline_html, current_html) {
        score += f64::from(LENGTH_POINTS);
    }

    score.min(100.0) as u8
}

/// Percentage (0-100) of content that changed.
///
/// Very different sizes are estimated from the length ratio alone; similar
/// sizes are compared on the first [`DIFF_SAMPLE_CHARS`] with a
/// character-multiset quick ratio. Deterministic and O(n) in the sample.
fn diff_percentage(old: &str, new: &str) -> f64 {
    let max_len = old.chars().count().max(new.chars().count());
    let min_len = old.chars().count().min(new.chars().count());
    if max_len == 0 {
        return 0.0;
    }

    let len_ratio = min_len as f64 / max_len as f64;
    if len_ratio < 0.5 {
        return (1.0 - len_ratio) * 100.0;
    }

    let old_sample: String = old.chars().take(DIFF_SAMPLE_CHARS).collect();
    let new_sample: String = new.chars().take(DIFF_SAMPLE_CHARS).collect();
    (1.0 - quick_ratio(&old_sample, &new_sample)) * 100.0
}

/// Character-frequency similarity: `2*M / T` where `M` is the multiset
/// intersection size and `T` the total length. An upper bound on the true
/// longest-common-subsequence ratio, computed in one pass per string.
fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let mut counts_a: std::collections::HashMap<char, i64> = std::collections::HashMap::new();
    for ch in a.chars() {
        *counts_a.entry(ch).or_insert(0) += 1;
    }

    let mut matches: i64 = 0;
    for ch in b.chars() {
        if let Some(remaining) = counts_a.get_mut(&ch) {
            if *remaining > 0 {
                *remaining -= 1;
                matches += 1;
            }
        }
    }

    (2.0 * matches as f64) / total as f64
}

fn extract_title(html: &str) -> String {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn title_changed(old: &str, new: &str) -> bool {
    extract_title(old) != extract_title(new)
}

/// Hrefs inside `<nav>`, falling back to `<header>`. Anchor-only links are
/// excluded by the href pattern itself.
fn nav_links(html: &str) -> HashSet<String> {
    let block = NAV_RE
        .captures(html)
        .or_else(|| HEADER_RE.captures(html))
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()));

    let Some(block) = block else {
        return HashSet::new();
    };

    HREF_RE
        .captures_iter(&block)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Whether more than 20% of nav links differ between versions.
fn nav_changed(old: &str, new: &str) -> bool {
    let old_links = nav_links(old);
    let new_links = nav_links(new);

    if old_links.is_empty() && new_links.is_empty() {
        return false;
    }
    if old_links.is_empty() || new_links.is_empty() {
        return true;
    }

    let diff = old_links.symmetric_difference(&new_links).count();
    let max_links = old_links.len().max(new_links.len());
    diff as f64 / max_links as f64 > 0.2
}

/// Whether content length moved by more than 30%.
fn significant_length_change(old: &str, new: &str) -> bool {
    if old.is_empty() {
        // Only significant if the new content is substantial.
        return new.len() > 1000;
    }
    let delta = new.len().abs_diff(old.len()) as f64;
    delta / old.len() as f64 > 0.3
}
