//! Crawler module for page fetching and document discovery
//!
//! This module contains the shared crawling machinery, including:
//! - HTTP fetching with retry logic
//! - HTML link extraction
//! - The frontier queue and politeness pacing
//! - Year and section routing
//! - The frontier document crawler and the fixed-page crawler

mod coordinator;
mod fetcher;
mod pages;
mod parser;
pub mod routing;
mod scheduler;

pub use coordinator::{crawl_documents, DocumentCrawler};
pub use fetcher::{
    build_http_client, compute_backoff_seconds, get_with_retries, strip_byte_order_mark,
    FetchError, FetchedPage, PostProcess, RetryPolicy, MAX_BACKOFF_SECONDS, RETRYABLE_STATUS,
};
pub use pages::{crawl_pages, PagesCrawler};
pub use parser::{
    collapse_whitespace, element_text, extract_links, extract_links_in_element,
    extract_links_scoped, filter_links, scan_document_urls, HtmlLink,
};
pub use routing::{DocRoute, YearMode};
pub use scheduler::{Frontier, NextPage, Politeness, QueueItem};
