//! Fixed-page document crawler
//!
//! Fetches each configured target page once, optionally emits the page
//! itself, and emits every linked document that passes the target's filters.

use crate::config::{ErrorPolicy, PageTarget, PagesConfig};
use crate::context::RunContext;
use crate::crawler::fetcher::{get_with_retries, RetryPolicy};
use crate::crawler::parser::{extract_links_scoped, filter_links};
use crate::crawler::scheduler::Politeness;
use crate::output::{CrawlOutcome, CrawlStats, RecordSink, StopReason, UrlRecord};
use crate::url::{canonicalize, infer_name_from_link, path_ext, CanonicalizeOptions};
use crate::{CrawlError, Result};
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Crawler for a fixed list of index pages
pub struct PagesCrawler<'a> {
    config: &'a PagesConfig,
    ctx: &'a RunContext,
    client: &'a Client,
    policy: RetryPolicy,
    politeness: Politeness,
    canon: CanonicalizeOptions,
    doc_exts: Vec<String>,
    seen: HashSet<String>,
    sink: RecordSink,
    stats: CrawlStats,
}

impl<'a> PagesCrawler<'a> {
    pub fn new(config: &'a PagesConfig, ctx: &'a RunContext, client: &'a Client) -> Self {
        Self {
            config,
            ctx,
            client,
            policy: RetryPolicy::new(&ctx.settings.http, &config.pacing),
            politeness: Politeness::from_pacing(&config.pacing),
            canon: CanonicalizeOptions::default(),
            doc_exts: config
                .allowed_doc_exts
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            seen: HashSet::new(),
            sink: RecordSink::with_limit(config.pacing.max_total_records),
            stats: CrawlStats::new(&config.name),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Visits every target in order
    pub async fn run(mut self) -> Result<CrawlOutcome> {
        let config = self.config;
        info!("[{}] visiting {} pages", config.name, config.targets.len());

        for target in &config.targets {
            let url = canonicalize(&target.url, &self.canon).ok_or_else(|| {
                CrawlError::InvalidStartUrl {
                    crawler: self.config.name.clone(),
                    url: target.url.clone(),
                }
            })?;

            self.politeness.wait().await;
            debug!("[{}] fetch -> {}", self.config.name, url);

            let page = match get_with_retries(self.client, &url, &self.policy, None).await {
                Ok(page) => page,
                Err(e) => {
                    if self.config.pacing.on_page_error == ErrorPolicy::Abort {
                        return Err(e.into());
                    }
                    warn!("[{}] skipping page: {}", self.config.name, e);
                    self.stats.pages_failed += 1;
                    continue;
                }
            };
            self.stats.pages_fetched += 1;

            let base = Url::parse(&page.url)
                .or_else(|_| Url::parse(&url))
                .map_err(|_| CrawlError::InvalidStartUrl {
                    crawler: self.config.name.clone(),
                    url: url.clone(),
                })?;

            self.process_target(target, &url, &base, &page.body);

            if self.sink.is_full() {
                self.stats.stopped_by = Some(StopReason::MaxRecords);
                break;
            }
        }

        let outcome = CrawlOutcome::from_sink(self.sink, self.stats);
        outcome.stats.log();
        Ok(outcome)
    }

    fn process_target(&mut self, target: &PageTarget, url: &str, base: &Url, body: &str) {
        if target.emit_page && self.seen.insert(url.to_string()) {
            let name = target
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .or_else(|| infer_name_from_link("", url));
            let record = UrlRecord::new(
                url,
                name,
                self.ctx.started_at_utc.clone(),
                self.config.name.clone(),
            )
            .with_meta("is_index_page", true);
            if !self.sink.push(record) {
                return;
            }
        }

        let links = extract_links_scoped(body, base, target.content_element_id.as_deref());
        let links = filter_links(
            links,
            target.text_contains.as_deref(),
            target.href_contains.as_deref(),
        );

        for link in links {
            let Some(doc_url) = canonicalize(&link.href, &self.canon) else {
                continue;
            };
            let ext = path_ext(&doc_url);
            if ext.is_empty() || !self.doc_exts.contains(&ext) {
                continue;
            }
            if self.seen.contains(&doc_url) {
                continue;
            }

            let record = UrlRecord::new(
                doc_url.clone(),
                infer_name_from_link(&link.text, &doc_url),
                self.ctx.started_at_utc.clone(),
                self.config.name.clone(),
            )
            .with_meta("is_index_page", false)
            .with_meta("discovered_from", url)
            .with_meta("link_text", link.text.clone())
            .with_meta("file_ext", ext.trim_start_matches('.'));

            if !self.sink.push(record) {
                return;
            }
            self.seen.insert(doc_url);
        }
    }
}

/// Runs one pages crawler
pub async fn crawl_pages(
    config: &PagesConfig,
    ctx: &RunContext,
    client: &Client,
) -> Result<CrawlOutcome> {
    PagesCrawler::new(config, ctx, client).run().await
}
