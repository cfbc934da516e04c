//! Runtime configuration.
//!
//! [`Settings`] is built once by the composition root and threaded into
//! every component by value or reference. There is no process-global
//! settings instance; tests construct their own.

mod builder;
mod types;

pub use builder::{SettingsBuilder, SettingsError};
pub use types::Settings;
