//! Telephone-directory crawler
//!
//! This module walks the government telephone directory breadth-first and
//! turns its result tables into deduplicated contact records:
//! - Page scope and department breadcrumbs (`tree`)
//! - Contact row extraction and phone/email normalization (`contacts`)
//! - Post-title abbreviation expansion (`abbrev`)
//! - Composite-key deduplication (`dedup`)

mod abbrev;
mod contacts;
mod dedup;
mod tree;

pub use abbrev::{Abbreviations, AppliedAbbreviation};
pub use contacts::{
    extract_contacts, is_enquiry_like, normalize_email, normalize_phone, Contact, TableKind,
};
pub use dedup::{dedup_key, department_id, department_root, ContactBook, Observation};
pub use tree::{clean_department_segment, extend_path, office_tree_paths, DirectoryPages};

use crate::config::{DirectoryConfig, ErrorPolicy};
use crate::context::RunContext;
use crate::crawler::{
    extract_links, get_with_retries, Frontier, NextPage, Politeness, QueueItem, RetryPolicy,
};
use crate::output::{CrawlOutcome, CrawlStats, StopReason};
use crate::{CrawlError, Result};
use reqwest::Client;
use scraper::Html;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

/// Everything the crawler needs from one parsed directory page
#[derive(Debug, Default)]
struct ParsedPage {
    tree_paths: HashMap<String, Vec<String>>,
    contacts: Vec<Contact>,
    links: Vec<(String, String)>,
}

/// Parses a directory page into owned data (`Html` must not cross an await)
fn parse_page(body: &str, base: &Url, pages: &DirectoryPages) -> ParsedPage {
    let document = Html::parse_document(body);
    let tree_paths = office_tree_paths(&document, base, pages);
    let contacts = extract_contacts(&document, base);

    let links = extract_links(body, base)
        .into_iter()
        .filter_map(|link| pages.crawlable(&link.href).map(|url| (url, link.text)))
        .collect();

    ParsedPage {
        tree_paths,
        contacts,
        links,
    }
}

/// Breadth-first directory crawler; the frontier payload is the breadcrumb
pub struct DirectoryCrawler<'a> {
    config: &'a DirectoryConfig,
    client: &'a Client,
    policy: RetryPolicy,
    politeness: Politeness,
    pages: DirectoryPages,
    index_url: String,
    frontier: Frontier<Vec<String>>,
    book: ContactBook,
    stats: CrawlStats,
}

impl<'a> DirectoryCrawler<'a> {
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidStartUrl`] if the index URL has no host.
    pub fn new(config: &'a DirectoryConfig, ctx: &'a RunContext, client: &'a Client) -> Result<Self> {
        let invalid = || CrawlError::InvalidStartUrl {
            crawler: config.name.clone(),
            url: config.index_url.clone(),
        };

        let pages = DirectoryPages::new(
            &config.index_url,
            &config.page_suffix,
            &config.excluded_path_fragments,
        )
        .ok_or_else(invalid)?;
        let index_url = pages.canonical(&config.index_url).ok_or_else(invalid)?;

        let abbreviations = config
            .abbreviations_path
            .as_deref()
            .map(Abbreviations::load)
            .unwrap_or_default();
        if !abbreviations.is_empty() {
            debug!("[{}] loaded {} abbreviations", config.name, abbreviations.len());
        }

        Ok(Self {
            config,
            client,
            policy: RetryPolicy::new(&ctx.settings.http, &config.pacing),
            politeness: Politeness::from_pacing(&config.pacing),
            pages,
            index_url,
            frontier: Frontier::new(config.max_pages),
            book: ContactBook::new(
                &config.name,
                &ctx.started_at_utc,
                abbreviations,
                config.pacing.max_total_records,
            ),
            stats: CrawlStats::new(&config.name),
        })
    }

    /// Overrides the retry policy (tests use this to disable backoff)
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Crawls the directory, returning contact records sorted by URL then dedup key
    ///
    /// # Errors
    ///
    /// A failed index page always aborts. Other page failures abort only when
    /// `on-page-error` is `abort`.
    pub async fn run(mut self) -> Result<CrawlOutcome> {
        info!("[{}] crawling directory from {}", self.config.name, self.index_url);

        self.frontier
            .push(QueueItem::seed(self.index_url.clone(), Vec::new()));

        loop {
            let item = match self.frontier.pop() {
                NextPage::Ready(item) => item,
                NextPage::CapReached => {
                    self.stats.stopped_by = Some(StopReason::MaxPages);
                    break;
                }
                NextPage::Exhausted => break,
            };

            self.frontier.mark_visited(&item.url);
            self.politeness.wait().await;

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

            let parsed = parse_page(&page.body, &base, &self.pages);
            self.process_page(&item, parsed);

            if self.book.is_full() {
                self.stats.stopped_by = Some(StopReason::MaxRecords);
                break;
            }
        }

        self.stats.records = self.book.len();
        let outcome = CrawlOutcome {
            records: self.book.into_records(),
            stats: self.stats,
        };
        outcome.stats.log();
        Ok(outcome)
    }

    fn process_page(&mut self, item: &QueueItem<Vec<String>>, parsed: ParsedPage) {
        let path = parsed
            .tree_paths
            .get(&item.url)
            .cloned()
            .unwrap_or_else(|| item.context.clone());

        debug!(
            "[{}] {} contacts at {} ({})",
            self.config.name,
            parsed.contacts.len(),
            item.url,
            path.join(" -> ")
        );

        for contact in &parsed.contacts {
            self.book.observe(&item.url, &path, contact);
        }
        self.book.remember_page(&item.url, parsed.contacts);

        for (url, text) in &parsed.links {
            let next_path = parsed
                .tree_paths
                .get(url)
                .cloned()
                .unwrap_or_else(|| extend_path(&path, text));

            if self.frontier.is_visited(url) {
                self.book.reobserve(url, &next_path);
            } else {
                self.frontier
                    .push(QueueItem::child(item, url.clone(), next_path));
            }
        }
    }
}

/// Runs one directory crawler
pub async fn crawl_directory(
    config: &DirectoryConfig,
    ctx: &RunContext,
    client: &Client,
) -> Result<CrawlOutcome> {
    DirectoryCrawler::new(config, ctx, client)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PacingConfig, Settings};

    fn directory_config() -> DirectoryConfig {
        DirectoryConfig {
            name: "tel".to_string(),
            index_url: "https://tel.example.gov.hk/index_ENG.html".to_string(),
            page_suffix: "_eng.html".to_string(),
            excluded_path_fragments: vec![],
            max_pages: 100,
            abbreviations_path: None,
            pacing: PacingConfig {
                request_delay_seconds: 0.0,
                request_jitter_seconds: 0.0,
                ..PacingConfig::default()
            },
        }
    }

    fn context() -> RunContext {
        RunContext::new(Settings::default(), None, false)
    }

    fn people_table(phone: &str) -> String {
        format!(
            r#"<table class="result-table full-list"><tr>
                 <td><a class="name" href="/p/1_ENG.html">CHAN Tai-man</a></td>
                 <td>Engineer</td>
                 <td><a href="tel:{phone}">{phone}</a></td>
               </tr></table>"#
        )
    }

    #[test]
    fn test_invalid_index_url() {
        let mut config = directory_config();
        config.index_url = "not a url".to_string();
        let ctx = context();
        let client = Client::new();
        assert!(matches!(
            DirectoryCrawler::new(&config, &ctx, &client),
            Err(CrawlError::InvalidStartUrl { .. })
        ));
    }

    #[test]
    fn test_parse_page_keeps_crawlable_links() {
        let config = directory_config();
        let pages = DirectoryPages::new(&config.index_url, &config.page_suffix, &[]).unwrap();
        let base = Url::parse(&config.index_url).unwrap();
        let html = format!(
            r#"<a href="/a_ENG.html">Bureau A</a><a href="/a_CHI.html">Chinese</a>{}"#,
            people_table("2123 4567")
        );

        let parsed = parse_page(&html, &base, &pages);
        assert_eq!(parsed.contacts.len(), 1);
        let urls: Vec<&str> = parsed.links.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://tel.example.gov.hk/a_ENG.html", "https://tel.example.gov.hk/p/1_ENG.html"]
        );
    }

    #[test]
    fn test_process_page_uses_link_breadcrumbs() {
        let config = directory_config();
        let ctx = context();
        let client = Client::new();
        let mut crawler = DirectoryCrawler::new(&config, &ctx, &client).unwrap();

        let seed = QueueItem::seed(crawler.index_url.clone(), Vec::new());
        crawler.frontier.mark_visited(&seed.url);
        let base = Url::parse(&seed.url).unwrap();
        let parsed = parse_page(
            r#"<a href="/a_ENG.html">Bureau A</a><a href="/b_ENG.html">Back</a>"#,
            &base,
            &crawler.pages,
        );
        crawler.process_page(&seed, parsed);

        let mut queued = Vec::new();
        while let NextPage::Ready(item) = crawler.frontier.pop() {
            crawler.frontier.mark_visited(&item.url);
            queued.push((item.url, item.context));
        }
        assert_eq!(
            queued,
            vec![
                ("https://tel.example.gov.hk/a_ENG.html".to_string(), vec!["Bureau A".to_string()]),
                ("https://tel.example.gov.hk/b_ENG.html".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn test_visited_page_reobserved_under_new_breadcrumb() {
        let config = directory_config();
        let ctx = context();
        let client = Client::new();
        let mut crawler = DirectoryCrawler::new(&config, &ctx, &client).unwrap();

        let division = QueueItem::seed(
            "https://tel.example.gov.hk/d1_ENG.html",
            vec!["Bureau A".to_string(), "Division 1".to_string()],
        );
        crawler.frontier.mark_visited(&division.url);
        let base = Url::parse(&division.url).unwrap();
        let parsed = parse_page(&people_table("2123 4567"), &base, &crawler.pages);
        crawler.process_page(&division, parsed);
        assert_eq!(crawler.book.len(), 1);

        // The same page linked from another branch
        let other = QueueItem::seed(
            "https://tel.example.gov.hk/b_ENG.html",
            vec!["Bureau B".to_string()],
        );
        crawler.frontier.mark_visited(&other.url);
        let parsed = parse_page(
            r#"<a href="/d1_ENG.html">Works Unit</a>"#,
            &base,
            &crawler.pages,
        );
        crawler.process_page(&other, parsed);

        assert_eq!(crawler.book.len(), 2);
        assert!(crawler
            .book
            .get("21234567|Bureau B -> Works Unit")
            .is_some());
    }
}
