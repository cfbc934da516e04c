//! External provider interfaces.
//!
//! The crawler and the language-model curator are abstract capabilities
//! with well-defined return shapes. Concrete providers are selected by
//! configuration at the composition root; the core compiles and tests
//! without any concrete provider present.

pub mod crawler;
pub mod llm;
mod types;

pub use crawler::Crawler;
pub use llm::{filter_relevant_pages, parse_json_response, LlmCurator};
pub use types::{
    CuratedPageData, FullCuration, PageCategorization, PageChange, PageRecord, ProviderError,
    RelevanceVerdict, SectionData, SectionOutcome, SignificanceVerdict, SiteContext,
};
