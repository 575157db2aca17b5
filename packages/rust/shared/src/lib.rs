//! Shared error model, configuration, and progress hooks for sitemigrate.
//!
//! This crate is the foundation depended on by all other sitemigrate crates.
//! It provides:
//! - [`SiteMigrateError`]: the unified error type
//! - Configuration ([`AppConfig`] and its sections, config loading)
//! - [`ProgressReporter`]: per-item progress callbacks used by the CLI

pub mod config;
pub mod error;
pub mod progress;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuditConfig, CONFIG_FILE_NAME, ContentConfig, FeaturedImage, MediaConfig,
    PathsConfig, RenameEntry, RuleConfig, init_config, load_config, load_config_from,
    render_config,
};
pub use error::{Result, SiteMigrateError};
pub use progress::{ProgressReporter, SilentProgress};
