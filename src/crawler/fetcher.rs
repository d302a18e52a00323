//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawlers, including:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests with bounded retries
//! - Exponential backoff with jitter and `Retry-After` support
//! - Error classification (HTTP status vs transport)

use crate::config::{HttpConfig, PacingConfig};
use rand::Rng;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Status codes that are retried before giving up
pub const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound of the exponential part of a backoff delay
pub const MAX_BACKOFF_SECONDS: f64 = 30.0;

/// `Retry-After` values above this are ignored
pub const MAX_RETRY_AFTER_SECONDS: f64 = 300.0;

/// A failed fetch after retries were exhausted (or a non-retryable response)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Transport { url, .. } => url,
        }
    }

    /// HTTP status of the final response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    pub status: u16,

    /// Content-Type header value ("" when absent)
    pub content_type: String,

    pub body: String,
}

/// Hook applied to every successful response before it is returned
pub type PostProcess = fn(&mut FetchedPage);

/// Retry and backoff parameters for [`get_with_retries`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub timeout: Duration,

    /// Retries after the first attempt (`max_retries + 1` attempts in total)
    pub max_retries: u32,

    pub backoff_base_seconds: f64,

    pub backoff_jitter_seconds: f64,

    pub post_process: Option<PostProcess>,
}

impl RetryPolicy {
    /// Combines the shared HTTP settings with one crawler's pacing settings
    pub fn new(http: &HttpConfig, pacing: &PacingConfig) -> Self {
        Self {
            timeout: Duration::from_secs(http.timeout_seconds),
            max_retries: http.max_retries,
            backoff_base_seconds: pacing.backoff_base_seconds,
            backoff_jitter_seconds: pacing.backoff_jitter_seconds,
            post_process: Some(strip_byte_order_mark),
        }
    }

    pub fn with_post_process(mut self, hook: Option<PostProcess>) -> Self {
        self.post_process = hook;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&HttpConfig::default(), &PacingConfig::default())
    }
}

/// Builds the HTTP client shared by all crawlers in a run
///
/// # Example
///
/// ```no_run
/// use hkgov_crawler::config::HttpConfig;
/// use hkgov_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let user_agent = if config.user_agent.trim().is_empty() {
        format!("hkgov-crawler/{}", env!("CARGO_PKG_VERSION"))
    } else {
        config.user_agent.trim().to_string()
    };

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.timeout_seconds.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Backoff before retry number `attempt + 1`
///
/// `min(base * 2^attempt, 30) + uniform(0, jitter)` seconds.
pub fn compute_backoff_seconds(attempt: u32, base: f64, jitter: f64) -> f64 {
    let exponential = (base * 2f64.powi(attempt.min(1023) as i32)).min(MAX_BACKOFF_SECONDS);
    exponential + random_jitter(jitter)
}

/// Uniform random seconds in `[0, upper]`; zero when `upper` is not positive
pub(crate) fn random_jitter(upper: f64) -> f64 {
    if upper > 0.0 && upper.is_finite() {
        rand::rng().random_range(0.0..=upper)
    } else {
        0.0
    }
}

/// Converts seconds to a `Duration`, or `None` when negative, NaN or too large
pub(crate) fn duration_from_seconds(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

/// Reads `Retry-After` as a number of seconds
///
/// HTTP-date values and values above [`MAX_RETRY_AFTER_SECONDS`] are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;

    if seconds > MAX_RETRY_AFTER_SECONDS {
        return None;
    }
    duration_from_seconds(seconds)
}

/// Removes a leading UTF-8 byte order mark from the body
pub fn strip_byte_order_mark(page: &mut FetchedPage) {
    if let Some(stripped) = page.body.strip_prefix('\u{feff}') {
        page.body = stripped.to_string();
    }
}

/// Fetches a URL with bounded retries
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Run the post-process hook and return |
/// | 429, 500, 502, 503, 504 | Sleep `Retry-After` (if numeric) plus backoff, retry |
/// | Any other status | Fail immediately |
/// | Transport error (connect, timeout, body read) | Sleep backoff, retry |
///
/// After `max_retries` retries the last error is returned.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `policy` - Timeout, retry count, backoff and post-processing
/// * `params` - Optional query parameters appended to the URL
pub async fn get_with_retries(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
    params: Option<&[(&str, &str)]>,
) -> Result<FetchedPage, FetchError> {
    let mut attempt: u32 = 0;

    loop {
        let is_last = attempt >= policy.max_retries;

        let mut request = client.get(url).timeout(policy.timeout);
        if let Some(params) = params {
            request = request.query(params);
        }

        debug!("GET {} (attempt {})", url, attempt + 1);

        let transport_error = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let code = status.as_u16();

                if RETRYABLE_STATUS.contains(&code) {
                    if is_last {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: code,
                        });
                    }

                    if let Some(wait) = parse_retry_after(response.headers()) {
                        debug!("Retry-After {:?} for {}", wait, url);
                        tokio::time::sleep(wait).await;
                    }

                    let backoff = compute_backoff_seconds(
                        attempt,
                        policy.backoff_base_seconds,
                        policy.backoff_jitter_seconds,
                    );
                    warn!(
                        "HTTP {} for {}, retrying in {:.2}s ({}/{})",
                        code,
                        url,
                        backoff,
                        attempt + 1,
                        policy.max_retries
                    );
                    tokio::time::sleep(duration_from_seconds(backoff).unwrap_or(Duration::ZERO)).await;
                    attempt += 1;
                    continue;
                }

                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: code,
                    });
                }

                let final_url = response.url().to_string();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                match response.text().await {
                    Ok(body) => {
                        let mut page = FetchedPage {
                            url: final_url,
                            status: code,
                            content_type,
                            body,
                        };
                        if let Some(hook) = policy.post_process {
                            hook(&mut page);
                        }
                        return Ok(page);
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        if is_last {
            return Err(FetchError::Transport {
                url: url.to_string(),
                source: transport_error,
            });
        }

        let backoff = compute_backoff_seconds(
            attempt,
            policy.backoff_base_seconds,
            policy.backoff_jitter_seconds,
        );
        warn!(
            "Request to {} failed ({}), retrying in {:.2}s ({}/{})",
            url,
            transport_error,
            backoff,
            attempt + 1,
            policy.max_retries
        );
        tokio::time::sleep(duration_from_seconds(backoff).unwrap_or(Duration::ZERO)).await;
        attempt += 1;
    }
}
