//! Artifact parsing: the inverse of assembly.
//!
//! Parses an existing artifact document back into its structure, used for
//! importing externally maintained documents and for verifying round-trips
//! in tests.

use std::sync::LazyLock;

use regex::Regex;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- \[(?P<title>[^\]]*)\]\((?P<url>[^)]+)\)(?::\s*(?P<desc>.*))?$")
        .expect("LINK_RE: hardcoded regex is valid")
});

/// One link bullet under a section's `### Links`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

/// One `##` section with its prose and links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    pub name: String,
    pub description: String,
    pub links: Vec<ParsedLink>,
}

/// A parsed artifact document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArtifact {
    pub site_title: String,
    pub tagline: String,
    pub overview: String,
    pub sections: Vec<ParsedSection>,
}

/// Parse an artifact document.
///
/// Tolerant of cosmetic variation: missing tagline, missing separators,
/// extra blank lines. Unknown leading lines before the `#` title are
/// skipped.
#[must_use]
pub fn parse_artifact(content: &str) -> ParsedArtifact {
    let mut artifact = ParsedArtifact::default();
    let mut overview_lines: Vec<String> = Vec::new();
    let mut current_section: Option<ParsedSection> = None;
    let mut section_prose: Vec<String> = Vec::new();
    let mut in_links = false;
    let mut seen_title = false;

    for line in content.lines() {
        let trimmed = line.trim_end();

        if let Some(title) = trimmed.strip_prefix("# ") {
            if !seen_title {
                artifact.site_title = title.trim().to_string();
                seen_title = true;
            }
            continue;
        }

        if let Some(name) = trimmed.strip_prefix("## ") {
            if let Some(mut section) = current_section.take() {
                section.description = section_prose.join("\n").trim().to_string();
                artifact.sections.push(section);
            }
            section_prose.clear();
            in_links = false;
            current_section = Some(ParsedSection {
                name: name.trim().to_string(),
                description: String::new(),
                links: Vec::new(),
            });
            continue;
        }

        if trimmed.trim() == "### Links" {
            in_links = true;
            continue;
        }

        if trimmed == "---" {
            continue;
        }

        if let Some(tagline) = trimmed.strip_prefix("> ") {
            if current_section.is_none() && artifact.tagline.is_empty() {
                artifact.tagline = tagline.trim().to_string();
            }
            continue;
        }

        match (&mut current_section, in_links) {
            (Some(section), true) => {
                if let Some(caps) = LINK_RE.captures(trimmed.trim()) {
                    section.links.push(ParsedLink {
                        title: caps["title"].to_string(),
                        url: caps["url"].to_string(),
                        description: caps.name("desc").map(|m| m.as_str().trim().to_string()),
                    });
                }
            }
            (Some(_), false) => {
                if !trimmed.trim().is_empty() {
                    section_prose.push(trimmed.trim().to_string());
                }
            }
            (None, _) => {
                // Between the header and the first section: overview prose.
                // The footer sentinel also lands here on full documents and
                // is filtered below.
                if seen_title && !trimmed.trim().is_empty() {
                    overview_lines.push(trimmed.trim().to_string());
                }
            }
        }
    }

    if let Some(mut section) = current_section.take() {
        section.description = section_prose.join("\n").trim().to_string();
        artifact.sections.push(section);
    }

    // The closing sentinel is assembly boilerplate, not overview content.
    overview_lines.retain(|l| !l.starts_with("This document helps AI systems understand"));
    artifact.overview = overview_lines.join("\n");

    artifact
}
