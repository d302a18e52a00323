//! Crawler dispatch and multi-crawler orchestration

use crate::config::{CrawlerSpec, ErrorPolicy};
use crate::context::RunContext;
use crate::crawler::{crawl_documents, crawl_pages};
use crate::directory::crawl_directory;
use crate::output::{sort_records, CrawlOutcome, CrawlStats, UrlRecord};
use crate::{CrawlError, Result};
use reqwest::Client;
use tracing::{error, info};

/// Combined result of every crawler that ran
#[derive(Debug, Default)]
pub struct RunReport {
    /// All records sorted by `(url, source)`
    pub records: Vec<UrlRecord>,

    /// Per-crawler statistics in run order
    pub stats: Vec<CrawlStats>,

    /// Crawlers that failed under the `continue` policy
    pub failed: Vec<String>,
}

/// Runs one configured crawler
pub async fn run_crawler(
    spec: &CrawlerSpec,
    ctx: &RunContext,
    client: &Client,
) -> Result<CrawlOutcome> {
    info!("Running crawler '{}' ({})", spec.name(), spec.kind());
    match spec {
        CrawlerSpec::Frontier(config) => crawl_documents(config, ctx, client).await,
        CrawlerSpec::Directory(config) => crawl_directory(config, ctx, client).await,
        CrawlerSpec::Pages(config) => crawl_pages(config, ctx, client).await,
    }
}

/// Crawlers to run: the one named by `selected`, or all of them in configured order
///
/// # Errors
///
/// Returns [`CrawlError::UnknownCrawler`] if `selected` names no crawler.
pub fn select_crawlers<'a>(
    ctx: &'a RunContext,
    selected: Option<&str>,
) -> Result<Vec<&'a CrawlerSpec>> {
    match selected {
        Some(name) => ctx
            .settings
            .crawler(name)
            .map(|spec| vec![spec])
            .ok_or_else(|| CrawlError::UnknownCrawler(name.to_string())),
        None => Ok(ctx.settings.crawlers.iter().collect()),
    }
}

/// Runs the selected crawlers in sequence and merges their records
///
/// A failing crawler aborts the run unless `[run] on-crawler-error` is
/// `continue`, in which case its error is logged and the others still run.
pub async fn run_all(
    ctx: &RunContext,
    client: &Client,
    selected: Option<&str>,
) -> Result<RunReport> {
    let specs = select_crawlers(ctx, selected)?;
    let mut report = RunReport::default();

    for spec in specs {
        match run_crawler(spec, ctx, client).await {
            Ok(outcome) => {
                report.records.extend(outcome.records);
                report.stats.push(outcome.stats);
            }
            Err(e) if ctx.settings.run.on_crawler_error == ErrorPolicy::Continue => {
                error!("Crawler '{}' failed: {}", spec.name(), e);
                report.stats.push(CrawlStats::new(spec.name()));
                report.failed.push(spec.name().to_string());
            }
            Err(e) => return Err(e),
        }
    }

    sort_records(&mut report.records);
    Ok(report)
}
