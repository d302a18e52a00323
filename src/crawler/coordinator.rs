//! Frontier crawl engine for document discovery
//!
//! This module contains the breadth-first loop shared by every document
//! crawler:
//! - Popping pages from the frontier and checking host and path scope
//! - Politeness delays and retrying fetches
//! - Partitioning links into documents to emit and pages to enqueue
//! - Year-selector and section routing on top of the plain frontier
//! - Record and page caps

use crate::config::{ErrorPolicy, FrontierConfig};
use crate::context::RunContext;
use crate::crawler::fetcher::{get_with_retries, RetryPolicy};
use crate::crawler::parser::{extract_links_scoped, scan_document_urls};
use crate::crawler::routing::{
    best_effort_year, probable_year, select_year_links, DocRoute, SectionRules, YearMode,
};
use crate::crawler::scheduler::{Frontier, NextPage, Politeness, QueueItem};
use crate::output::{CrawlOutcome, CrawlStats, RecordSink, StopReason, UrlRecord};
use crate::url::{
    authority_of, canonicalize, infer_name_from_link, path_ext, CanonicalizeOptions, Scope,
    ScopeDecision,
};
use crate::{CrawlError, Result};
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// A link that survived canonicalization, with its anchor text
#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    text: String,
}

/// Breadth-first document crawler driven by a [`FrontierConfig`]
///
/// All per-run state (frontier, seen documents, emitted records) lives on
/// the crawler and is dropped with it.
pub struct DocumentCrawler<'a> {
    config: &'a FrontierConfig,
    ctx: &'a RunContext,
    client: &'a Client,
    policy: RetryPolicy,
    politeness: Politeness,
    canon: CanonicalizeOptions,
    scope: Scope,
    sections: SectionRules,
    doc_exts: Vec<String>,
    start_url: String,
    frontier: Frontier<DocRoute>,
    seen_docs: HashSet<String>,
    sink: RecordSink,
    stats: CrawlStats,
}

impl<'a> DocumentCrawler<'a> {
    /// Creates a crawler for one configured frontier crawl
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidStartUrl`] if the start or base URL does
    /// not canonicalize to an absolute http(s) URL.
    pub fn new(config: &'a FrontierConfig, ctx: &'a RunContext, client: &'a Client) -> Result<Self> {
        let canon = CanonicalizeOptions::default();
        let invalid = |url: &str| CrawlError::InvalidStartUrl {
            crawler: config.name.clone(),
            url: url.to_string(),
        };

        let start_url =
            canonicalize(&config.start_url, &canon).ok_or_else(|| invalid(&config.start_url))?;
        let base = config.base_url.as_deref().unwrap_or(&start_url);
        let crawl_authority = authority_of(base).ok_or_else(|| invalid(base))?;
        let start_path = Url::parse(&start_url)
            .map_err(|_| invalid(&start_url))?
            .path()
            .to_string();

        let scope = Scope::new(crawl_authority)
            .with_explicit_paths(
                config
                    .explicit_allowed_paths
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(start_path.as_str())),
            )
            .with_allowed_prefixes(config.allowed_page_path_prefixes.iter().cloned())
            .with_excluded_prefixes(config.excluded_page_path_prefixes.iter().cloned());

        let pacing = &config.pacing;

        Ok(Self {
            config,
            ctx,
            client,
            policy: RetryPolicy::new(&ctx.settings.http, pacing),
            politeness: Politeness::from_pacing(pacing),
            canon,
            scope,
            sections: SectionRules::new(&config.sections),
            doc_exts: config
                .allowed_doc_exts
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            start_url,
            frontier: Frontier::new(config.max_pages),
            seen_docs: HashSet::new(),
            sink: RecordSink::with_limit(pacing.max_total_records),
            stats: CrawlStats::new(&config.name),
        })
    }

    /// Overrides the retry policy (tests use this to disable backoff)
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs the crawl to completion or until a cap is reached
    ///
    /// Returns the emitted records sorted by URL.
    ///
    /// # Errors
    ///
    /// A failed start page always aborts. Other page failures abort only when
    /// the crawler's `on-page-error` is `abort`.
    pub async fn run(mut self) -> Result<CrawlOutcome> {
        info!("[{}] crawling from {}", self.config.name, self.start_url);

        self.frontier
            .push(QueueItem::seed(self.start_url.clone(), DocRoute::default()));

        loop {
            let item = match self.frontier.pop() {
                NextPage::Ready(item) => item,
                NextPage::CapReached => {
                    self.stats.stopped_by = Some(StopReason::MaxPages);
                    break;
                }
                NextPage::Exhausted => break,
            };

            match self.scope.classify(&item.url) {
                ScopeDecision::Allowed => {}
                ScopeDecision::OtherHost => {
                    debug!("[{}] other host, dropped: {}", self.config.name, item.url);
                    continue;
                }
                ScopeDecision::OutOfScope => {
                    self.skip_page(&item.url);
                    continue;
                }
            }

            self.frontier.mark_visited(&item.url);
            self.politeness.wait().await;

            debug!(
                "[{}] fetch depth={} year={:?} mode={} -> {}",
                self.config.name, item.depth, item.context.year_context, item.context.year_mode, item.url
            );

            let page = match get_with_retries(self.client, &item.url, &self.policy, None).await {
                Ok(page) => page,
                Err(e) => {
                    if item.is_seed() || self.config.pacing.on_page_error == ErrorPolicy::Abort {
                        return Err(e.into());
                    }
                    warn!("[{}] skipping page: {}", self.config.name, e);
                    self.stats.pages_failed += 1;
                    continue;
                }
            };
            self.stats.pages_fetched += 1;

            let base = Url::parse(&page.url)
                .or_else(|_| Url::parse(&item.url))
                .map_err(|_| CrawlError::InvalidStartUrl {
                    crawler: self.config.name.clone(),
                    url: item.url.clone(),
                })?;

            self.process_page(&item, &base, &page.body);

            if self.sink.is_full() {
                self.stats.stopped_by = Some(StopReason::MaxRecords);
                break;
            }
        }

        let outcome = CrawlOutcome::from_sink(self.sink, self.stats);
        outcome.stats.log();
        Ok(outcome)
    }

    fn skip_page(&mut self, url: &str) {
        if !self.frontier.state(url).is_terminal() {
            debug!("[{}] out of scope: {}", self.config.name, url);
            self.frontier.mark_skipped(url);
            self.stats.pages_out_of_scope += 1;
        }
    }

    fn is_document(&self, url: &str) -> bool {
        let ext = path_ext(url);
        !ext.is_empty() && self.doc_exts.contains(&ext)
    }

    /// Emits documents and enqueues child pages for one fetched page
    fn process_page(&mut self, item: &QueueItem<DocRoute>, base: &Url, body: &str) {
        let mut links = extract_links_scoped(body, base, self.config.content_element_id.as_deref());
        if self.config.max_out_links_per_page > 0 {
            links.truncate(self.config.max_out_links_per_page);
        }

        let mut documents = Vec::new();
        let mut pages = Vec::new();
        for link in links {
            let Some(url) = canonicalize(&link.href, &self.canon) else {
                continue;
            };
            let candidate = Candidate {
                url,
                text: link.text,
            };
            if self.is_document(&candidate.url) {
                documents.push(candidate);
            } else {
                pages.push(candidate);
            }
        }

        if self.config.scan_raw_document_urls {
            let anchored: HashSet<String> = documents.iter().map(|d| d.url.clone()).collect();
            for raw in scan_document_urls(body, base, &self.doc_exts) {
                if let Some(url) = canonicalize(&raw, &self.canon) {
                    if !anchored.contains(&url) && self.is_document(&url) {
                        documents.push(Candidate {
                            url,
                            text: String::new(),
                        });
                    }
                }
            }
        }

        for document in &documents {
            self.emit_document(item, document);
            if self.sink.is_full() {
                return;
            }
        }

        if item.depth >= self.config.max_depth {
            return;
        }

        self.enqueue_pages(item, &pages);
    }

    fn emit_document(&mut self, item: &QueueItem<DocRoute>, document: &Candidate) {
        let Ok(parsed) = Url::parse(&document.url) else {
            return;
        };
        if !self.scope.same_host(&parsed) {
            return;
        }

        let prefixes = &self.config.allowed_doc_path_prefixes;
        if !prefixes.is_empty() && !prefixes.iter().any(|p| parsed.path().starts_with(p.as_str())) {
            return;
        }

        if self.seen_docs.contains(&document.url) {
            return;
        }

        let doc_year = best_effort_year(&[document.text.as_str(), document.url.as_str()]);
        if item.context.year_mode == YearMode::BestEffort {
            if let (Some(year), Some(min)) = (doc_year, self.config.min_year) {
                if year < min {
                    debug!("[{}] below year {}: {}", self.config.name, min, document.url);
                    return;
                }
            }
        }

        let ext = path_ext(&document.url);
        let route = &item.context;
        let record = UrlRecord::new(
            document.url.clone(),
            infer_name_from_link(&document.text, &document.url),
            self.ctx.started_at_utc.clone(),
            self.config.name.clone(),
        )
        .with_meta("start_url", self.start_url.clone())
        .with_meta("discovered_from", item.url.clone())
        .with_meta("depth", item.depth)
        .with_meta("link_text", document.text.clone())
        .with_meta("section", route.section.clone())
        .with_meta("year_context", route.year_context)
        .with_meta("year_mode", route.year_mode.as_str())
        .with_meta("best_effort_year", doc_year)
        .with_meta("file_ext", ext.trim_start_matches('.'));

        if self.sink.push(record) {
            self.seen_docs.insert(document.url.clone());
        }
    }

    /// Applies year, section and scope routing to the page links of one page
    fn enqueue_pages(&mut self, item: &QueueItem<DocRoute>, pages: &[Candidate]) {
        let route = &item.context;

        let mut selector_urls = HashSet::new();
        if let Some(min_year) = self.config.min_year {
            let year_links: Vec<(i32, String)> = pages
                .iter()
                .filter_map(|page| probable_year(&page.text).map(|year| (year, page.url.clone())))
                .filter(|(_, url)| self.scope.allows(url))
                .collect();

            let selection = select_year_links(&year_links, min_year);
            if selection.mode != YearMode::None {
                debug!(
                    "[{}] year selector on {} ({}), following {} of {}",
                    self.config.name,
                    item.url,
                    selection.mode,
                    selection.follow.len(),
                    year_links.len()
                );
            }
            for (year, url) in &selection.follow {
                let context = DocRoute {
                    year_context: Some(*year),
                    year_mode: selection.mode,
                    ..route.clone()
                };
                self.frontier.push(QueueItem::child(item, url.clone(), context));
            }
            selector_urls = selection.selector_urls;
        }

        if route.section.is_none() && !self.sections.is_empty() {
            let section_links: Vec<(String, String, String)> = pages
                .iter()
                .filter(|page| !selector_urls.contains(&page.url))
                .filter_map(|page| {
                    self.sections
                        .match_section_link(&page.url, &page.text)
                        .map(|(name, slug)| (page.url.clone(), name, slug))
                })
                .filter(|(url, _, _)| self.scope.allows(url))
                .collect();

            if !section_links.is_empty() {
                for (url, name, slug) in section_links {
                    debug!("[{}] section '{}' -> {}", self.config.name, name, url);
                    let context = DocRoute {
                        section: Some(name),
                        section_root_slug: Some(slug),
                        ..route.clone()
                    };
                    self.frontier.push(QueueItem::child(item, url, context));
                }
                return;
            }
        }

        for page in pages {
            if selector_urls.contains(&page.url) {
                continue;
            }

            match self.scope.classify(&page.url) {
                ScopeDecision::Allowed => {}
                ScopeDecision::OtherHost => continue,
                ScopeDecision::OutOfScope => {
                    self.skip_page(&page.url);
                    continue;
                }
            }

            if let Some(root) = &route.section_root_slug {
                if !self.sections.child_allowed(root, &page.url) {
                    continue;
                }
            }

            self.frontier
                .push(QueueItem::child(item, page.url.clone(), route.clone()));
        }
    }
}

/// Runs one frontier crawler
pub async fn crawl_documents(
    config: &FrontierConfig,
    ctx: &RunContext,
    client: &Client,
) -> Result<CrawlOutcome> {
    DocumentCrawler::new(config, ctx, client)?.run().await
}
