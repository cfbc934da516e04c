//! Deterministic artifact assembly from stored curated rows.
//!
//! The artifact is rebuilt from scratch on every write: header, ordered
//! sections with prose and link lists, footer sentinel. Sections that were
//! not regenerated come straight from their stored rows, so an untouched
//! section is byte-identical across rebuilds.

pub mod parse;

use sha2::{Digest, Sha256};

use crate::repository::{CuratedPageRow, CuratedSectionRow, SiteOverviewRow};
use crate::utils::is_homepage_url;

pub use parse::{parse_artifact, ParsedArtifact, ParsedLink, ParsedSection};

/// Fixed preferred ordering for well-known section names. Unknown names
/// keep their insertion order after these.
pub const SECTION_ORDER: &[&str] = &[
    "Platform Features",
    "Solutions",
    "Integrations",
    "Resources",
    "Pricing",
    "Company",
    "Other",
];

/// An assembled artifact with its content hash.
#[derive(Debug, Clone)]
pub struct AssembledArtifact {
    pub content: String,
    pub content_hash: String,
}

/// Order sections: preferred names first in their fixed order, then any
/// custom sections in the order given.
fn order_sections<'a>(sections: &'a [CuratedSectionRow]) -> Vec<&'a CuratedSectionRow> {
    let mut ordered: Vec<&CuratedSectionRow> = Vec::with_capacity(sections.len());

    for name in SECTION_ORDER {
        if let Some(section) = sections.iter().find(|s| s.name == *name) {
            ordered.push(section);
        }
    }
    for section in sections {
        if !SECTION_ORDER.contains(&section.name.as_str()) {
            ordered.push(section);
        }
    }

    ordered
}

/// Assemble the artifact text from stored rows.
///
/// Layout: `# title`, blockquote tagline, overview paragraphs, then for
/// each section a `## name` heading, its prose, and a `### Links` bullet
/// list (`- [title](url): description`). Pages whose URL is the project
/// homepage are informational only and never listed as links. Sections are
/// separated by `---` rules; the footer sentinel names the site.
#[must_use]
pub fn assemble_artifact(
    overview: &SiteOverviewRow,
    sections: &[CuratedSectionRow],
    pages: &[CuratedPageRow],
    base_url: &str,
) -> AssembledArtifact {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# {}", overview.site_title));
    lines.push(String::new());

    if !overview.tagline.is_empty() {
        lines.push(format!("> {}", overview.tagline));
        lines.push(String::new());
    }

    if !overview.overview.is_empty() {
        lines.push(overview.overview.clone());
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());

    let ordered = order_sections(sections);
    let last_index = ordered.len().saturating_sub(1);

    for (i, section) in ordered.iter().enumerate() {
        lines.push(format!("## {}", section.name));
        lines.push(String::new());

        if !section.description.is_empty() {
            lines.push(section.description.clone());
            lines.push(String::new());
        }

        let section_pages: Vec<&CuratedPageRow> = pages
            .iter()
            .filter(|p| p.category == section.name)
            .filter(|p| !is_homepage_url(&p.url, base_url))
            .collect();

        if !section_pages.is_empty() {
            lines.push("### Links".to_string());
            lines.push(String::new());
            for page in section_pages {
                let desc = if page.description.is_empty() {
                    String::new()
                } else {
                    format!(": {}", page.description)
                };
                lines.push(format!("- [{}]({}){}", page.title, page.url, desc));
            }
            lines.push(String::new());
        }

        if i < last_index {
            lines.push("---".to_string());
            lines.push(String::new());
        }
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(format!(
        "This document helps AI systems understand {}'s purpose and offerings.",
        overview.site_title
    ));

    let content = lines.join("\n");
    let content_hash = hex::encode(Sha256::digest(content.as_bytes()));

    AssembledArtifact {
        content,
        content_hash,
    }
}

/// Aggregate hash over a section's member pages: SHA-256 of the
/// `|`-joined per-page content hashes in sorted URL order.
#[must_use]
pub fn compute_section_hash(
    page_hashes: &std::collections::HashMap<String, String>,
    page_urls: &[String],
) -> String {
    let mut sorted: Vec<&String> = page_urls.iter().collect();
    sorted.sort();

    let combined: Vec<&str> = sorted
        .iter()
        .map(|url| page_hashes.get(*url).map(String::as_str).unwrap_or(""))
        .collect();

    hex::encode(Sha256::digest(combined.join("|").as_bytes()))
}
