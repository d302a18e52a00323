use serde::Deserialize;
use std::path::PathBuf;

/// Main settings structure, loaded once per run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub run: RunConfig,
    /// Crawlers in the order they run when no single crawler is selected
    #[serde(default, rename = "crawler")]
    pub crawlers: Vec<CrawlerSpec>,
}

impl Settings {
    /// Looks up a configured crawler by name
    pub fn crawler(&self, name: &str) -> Option<&CrawlerSpec> {
        self.crawlers.iter().find(|spec| spec.name() == name)
    }
}

/// HTTP settings shared by every crawler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request (empty = client default)
    pub user_agent: String,

    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: String::new(),
            max_retries: 3,
        }
    }
}

/// Orchestration settings for multi-crawler runs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunConfig {
    /// What to do when one crawler fails during a multi-crawler run
    pub on_crawler_error: ErrorPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            on_crawler_error: ErrorPolicy::Abort,
        }
    }
}

/// Whether a failure aborts the surrounding operation or is logged and skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    #[serde(alias = "skip")]
    Continue,
    Abort,
}

/// One configured crawler, tagged by `kind`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CrawlerSpec {
    Frontier(FrontierConfig),
    Directory(DirectoryConfig),
    Pages(PagesConfig),
}

impl CrawlerSpec {
    /// The crawler name, also used as the `source` of emitted records
    pub fn name(&self) -> &str {
        match self {
            Self::Frontier(cfg) => &cfg.name,
            Self::Directory(cfg) => &cfg.name,
            Self::Pages(cfg) => &cfg.name,
        }
    }

    /// Pacing, retry and cap settings for this crawler
    pub fn pacing(&self) -> &PacingConfig {
        match self {
            Self::Frontier(cfg) => &cfg.pacing,
            Self::Directory(cfg) => &cfg.pacing,
            Self::Pages(cfg) => &cfg.pacing,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Frontier(_) => "frontier",
            Self::Directory(_) => "directory",
            Self::Pages(_) => "pages",
        }
    }
}

/// Politeness, backoff and record-cap settings common to all crawler kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PacingConfig {
    /// Base delay before every page fetch (seconds)
    pub request_delay_seconds: f64,

    /// Upper bound of the uniform random jitter added to the delay (seconds)
    pub request_jitter_seconds: f64,

    /// Exponential backoff base for retries (seconds)
    pub backoff_base_seconds: f64,

    /// Upper bound of the uniform random jitter added to each backoff (seconds)
    pub backoff_jitter_seconds: f64,

    /// Stop the crawler once this many records have been emitted
    pub max_total_records: usize,

    /// What to do when a non-seed page fails to fetch
    pub on_page_error: ErrorPolicy,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_delay_seconds: 0.25,
            request_jitter_seconds: 0.10,
            backoff_base_seconds: 0.5,
            backoff_jitter_seconds: 0.25,
            max_total_records: 50_000,
            on_page_error: ErrorPolicy::Continue,
        }
    }
}

/// Breadth-first document crawl rooted at one start page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FrontierConfig {
    pub name: String,

    pub start_url: String,

    /// Origin whose host bounds the crawl; defaults to the start URL's host
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub allowed_page_path_prefixes: Vec<String>,

    /// Exact paths that are always in scope (the start path is added automatically)
    #[serde(default)]
    pub explicit_allowed_paths: Vec<String>,

    #[serde(default)]
    pub excluded_page_path_prefixes: Vec<String>,

    #[serde(default = "default_doc_exts")]
    pub allowed_doc_exts: Vec<String>,

    /// When non-empty, documents must live under one of these path prefixes
    #[serde(default)]
    pub allowed_doc_path_prefixes: Vec<String>,

    /// Id of the content container links are scoped to (whole page as fallback)
    #[serde(default)]
    pub content_element_id: Option<String>,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// 0 means unlimited
    #[serde(default = "default_max_out_links")]
    pub max_out_links_per_page: usize,

    /// Enables year-selector routing
    #[serde(default)]
    pub min_year: Option<i32>,

    #[serde(default)]
    pub sections: Vec<SectionConfig>,

    /// Also scan raw HTML (scripts, attributes) for document URLs
    #[serde(default)]
    pub scan_raw_document_urls: bool,

    #[serde(flatten)]
    pub pacing: PacingConfig,
}

/// A known section root and the child slugs recursion may follow beneath it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SectionConfig {
    /// Last path segment of the section root page
    pub slug: String,

    pub name: String,

    #[serde(default)]
    pub child_slug_prefixes: Vec<String>,
}

/// Telephone-directory traversal with contact deduplication
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DirectoryConfig {
    pub name: String,

    pub index_url: String,

    /// Lowercase path suffix every crawlable directory page carries
    #[serde(default = "default_page_suffix")]
    pub page_suffix: String,

    #[serde(default = "default_excluded_fragments")]
    pub excluded_path_fragments: Vec<String>,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// JSON object mapping post-title abbreviations to their long forms
    #[serde(default)]
    pub abbreviations_path: Option<PathBuf>,

    #[serde(flatten)]
    pub pacing: PacingConfig,
}

/// A fixed list of pages whose linked documents are emitted
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PagesConfig {
    pub name: String,

    #[serde(default = "default_doc_exts")]
    pub allowed_doc_exts: Vec<String>,

    #[serde(default)]
    pub targets: Vec<PageTarget>,

    #[serde(flatten)]
    pub pacing: PacingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PageTarget {
    pub url: String,

    /// Record name for the page itself
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content_element_id: Option<String>,

    /// Case-insensitive substring the link text must contain
    #[serde(default)]
    pub text_contains: Option<String>,

    /// Case-insensitive substring the link URL must contain
    #[serde(default)]
    pub href_contains: Option<String>,

    /// Emit a record for the page itself
    #[serde(default = "default_true")]
    pub emit_page: bool,
}

fn default_doc_exts() -> Vec<String> {
    vec![".pdf".to_string()]
}

fn default_max_depth() -> u32 {
    6
}

fn default_max_pages() -> usize {
    2000
}

fn default_max_out_links() -> usize {
    800
}

fn default_page_suffix() -> String {
    "_eng.html".to_string()
}

fn default_excluded_fragments() -> Vec<String> {
    vec!["/zipinstruct/".to_string()]
}

fn default_true() -> bool {
    true
}
