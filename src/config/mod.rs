//! Settings module
//!
//! This module handles loading, parsing, and validating the TOML settings file.
//!
//! # Example
//!
//! ```no_run
//! use hkgov_crawler::config::load_settings;
//! use std::path::Path;
//!
//! let settings = load_settings(Path::new("settings.toml")).unwrap();
//! println!("Configured crawlers: {}", settings.crawlers.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlerSpec, DirectoryConfig, ErrorPolicy, FrontierConfig, HttpConfig, PacingConfig,
    PageTarget, PagesConfig, RunConfig, SectionConfig, Settings,
};

// Re-export parser functions
pub use parser::{compute_settings_hash, load_settings, load_settings_with_hash, parse_settings};
