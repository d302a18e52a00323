//! hkgov-crawler: document and contact discovery for Hong Kong government sites
//!
//! This crate implements breadth-first crawlers that discover published documents
//! (mostly PDFs) and telephone-directory contacts, emitting normalized `UrlRecord`
//! entries for JSON Lines output.

pub mod config;
pub mod context;
pub mod crawler;
pub mod directory;
pub mod output;
pub mod runner;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid start URL for crawler '{crawler}': {url}")]
    InvalidStartUrl { crawler: String, url: String },

    #[error("Unknown crawler: {0}")]
    UnknownCrawler(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in settings: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Settings;
pub use context::RunContext;
pub use output::{RecordSink, UrlRecord};
pub use state::PageState;
pub use crate::url::{canonicalize, CanonicalizeOptions};
