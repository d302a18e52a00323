use crate::config::types::{
    CrawlerSpec, DirectoryConfig, FrontierConfig, HttpConfig, PacingConfig, PagesConfig, Settings,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Largest accepted pacing value, in seconds
const MAX_PACING_SECONDS: f64 = 3600.0;

/// Validates the entire settings tree
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_http_config(&settings.http)?;

    let mut names = HashSet::new();
    for spec in &settings.crawlers {
        let name = spec.name();
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "crawler name cannot be empty".to_string(),
            ));
        }
        if !names.insert(name) {
            return Err(ConfigError::Validation(format!(
                "crawler name '{}' is configured more than once",
                name
            )));
        }

        validate_pacing(name, spec.pacing())?;

        match spec {
            CrawlerSpec::Frontier(cfg) => validate_frontier(cfg)?,
            CrawlerSpec::Directory(cfg) => validate_directory(cfg)?,
            CrawlerSpec::Pages(cfg) => validate_pages(cfg)?,
        }
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "http.timeout-seconds must be >= 1".to_string(),
        ));
    }

    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "http.user-agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

fn validate_pacing(name: &str, pacing: &PacingConfig) -> Result<(), ConfigError> {
    let seconds = [
        ("request-delay-seconds", pacing.request_delay_seconds),
        ("request-jitter-seconds", pacing.request_jitter_seconds),
        ("backoff-base-seconds", pacing.backoff_base_seconds),
        ("backoff-jitter-seconds", pacing.backoff_jitter_seconds),
    ];

    for (key, value) in seconds {
        if !value.is_finite() || !(0.0..=MAX_PACING_SECONDS).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{}: {} must be between 0 and {} seconds, got {}",
                name, key, MAX_PACING_SECONDS, value
            )));
        }
    }

    if pacing.max_total_records < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: max-total-records must be >= 1",
            name
        )));
    }

    Ok(())
}

fn validate_frontier(config: &FrontierConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.name, "start-url", &config.start_url)?;
    if let Some(base_url) = &config.base_url {
        validate_http_url(&config.name, "base-url", base_url)?;
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: max-pages must be >= 1",
            config.name
        )));
    }

    validate_doc_exts(&config.name, &config.allowed_doc_exts)?;

    for prefix in config
        .allowed_page_path_prefixes
        .iter()
        .chain(&config.excluded_page_path_prefixes)
        .chain(&config.allowed_doc_path_prefixes)
    {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{}: path prefix '{}' must start with '/'",
                config.name, prefix
            )));
        }
    }

    if let Some(year) = config.min_year {
        if !(1900..=2100).contains(&year) {
            return Err(ConfigError::Validation(format!(
                "{}: min-year must be between 1900 and 2100, got {}",
                config.name, year
            )));
        }
    }

    for section in &config.sections {
        if section.slug.trim().is_empty() || section.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: sections need a non-empty slug and name",
                config.name
            )));
        }
    }

    Ok(())
}

fn validate_directory(config: &DirectoryConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.name, "index-url", &config.index_url)?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: max-pages must be >= 1",
            config.name
        )));
    }

    if config.page_suffix.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{}: page-suffix cannot be empty",
            config.name
        )));
    }

    Ok(())
}

fn validate_pages(config: &PagesConfig) -> Result<(), ConfigError> {
    validate_doc_exts(&config.name, &config.allowed_doc_exts)?;

    for target in &config.targets {
        validate_http_url(&config.name, "targets.url", &target.url)?;
    }

    Ok(())
}

fn validate_doc_exts(name: &str, exts: &[String]) -> Result<(), ConfigError> {
    if exts.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{}: allowed-doc-exts cannot be empty",
            name
        )));
    }

    for ext in exts {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "{}: document extension '{}' must look like '.pdf'",
                name, ext
            )));
        }
    }

    Ok(())
}

/// Validates that a URL parses and uses HTTP or HTTPS
fn validate_http_url(name: &str, key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| {
        ConfigError::InvalidUrl(format!("{}: invalid {} '{}': {}", name, key, value, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{}: {} '{}' must use http or https",
            name, key, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{}: {} '{}' has no host",
            name, key, value
        )));
    }

    Ok(())
}
