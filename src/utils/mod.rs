//! Shared URL utilities.

pub mod url_utils;

pub use url_utils::{is_homepage_url, is_valid_url, normalize_url};
