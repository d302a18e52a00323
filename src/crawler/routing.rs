//! Year-selector and section routing for document crawls
//!
//! Both are layered on top of the plain frontier: they only decide which
//! discovered page links are enqueued and with what [`DocRoute`] context.

use crate::config::SectionConfig;
use crate::crawler::parser::collapse_whitespace;
use crate::url::last_path_segment;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static YEAR_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("hardcoded regex is valid"));

/// How documents under a page are filtered by year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum YearMode {
    /// No year selector seen on the way to this page
    #[default]
    None,

    /// The selector offered the minimum year; only year pages >= minimum are followed
    Strict,

    /// The selector lacked the minimum year; documents are filtered by the year in their text/URL
    BestEffort,
}

impl YearMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Strict => "strict",
            Self::BestEffort => "best_effort",
        }
    }
}

impl fmt::Display for YearMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing context carried by every queued page of a document crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocRoute {
    /// Display name of the section the page belongs to
    pub section: Option<String>,

    /// Lowercase slug of the section root page
    pub section_root_slug: Option<String>,

    /// Year selected on the way to this page
    pub year_context: Option<i32>,

    pub year_mode: YearMode,
}

/// Year value of a link whose trimmed text is exactly four digits in 1900..=2100
pub fn probable_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.len() != 4 || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text.parse().ok()?;
    (1900..=2100).contains(&year).then_some(year)
}

/// The most recent 19xx/20xx year mentioned in any of `parts`
pub fn best_effort_year(parts: &[&str]) -> Option<i32> {
    parts
        .iter()
        .flat_map(|part| YEAR_IN_TEXT.find_iter(part))
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .max()
}

/// Which year-selector links a page should follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSelection {
    pub mode: YearMode,

    /// Year links to enqueue, in page order
    pub follow: Vec<(i32, String)>,

    /// Every year-selector URL on the page, followed or not
    pub selector_urls: HashSet<String>,
}

/// Chooses year links to follow given the configured minimum year
///
/// If the minimum year is offered the mode is strict and years >= minimum
/// are followed. Otherwise the mode is best-effort: years >= minimum are
/// followed when any exist, else every year is followed.
pub fn select_year_links(year_links: &[(i32, String)], min_year: i32) -> YearSelection {
    let selector_urls = year_links.iter().map(|(_, url)| url.clone()).collect();

    if year_links.is_empty() {
        return YearSelection {
            mode: YearMode::None,
            follow: Vec::new(),
            selector_urls,
        };
    }

    let strict = year_links.iter().any(|(year, _)| *year == min_year);
    let any_recent = year_links.iter().any(|(year, _)| *year >= min_year);

    let mut seen = HashSet::new();
    let follow = year_links
        .iter()
        .filter(|(year, _)| !any_recent || *year >= min_year)
        .filter(|(_, url)| seen.insert(url.clone()))
        .cloned()
        .collect();

    YearSelection {
        mode: if strict {
            YearMode::Strict
        } else {
            YearMode::BestEffort
        },
        follow,
        selector_urls,
    }
}

/// Section roots and the child slugs recursion may follow beneath each
#[derive(Debug, Clone, Default)]
pub struct SectionRules {
    sections: Vec<SectionConfig>,
}

impl SectionRules {
    pub fn new(sections: &[SectionConfig]) -> Self {
        Self {
            sections: sections.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Matches a link that starts a section, by root slug or by section name
    ///
    /// Returns the section name and the lowercase root slug.
    pub fn match_section_link(&self, url: &str, text: &str) -> Option<(String, String)> {
        let slug = last_path_segment(url).to_lowercase();
        let text = collapse_whitespace(text).to_lowercase();

        self.sections
            .iter()
            .find(|section| {
                (!slug.is_empty() && section.slug.trim().to_lowercase() == slug)
                    || (!text.is_empty() && section.name.trim().to_lowercase() == text)
            })
            .map(|section| (section.name.clone(), slug))
    }

    /// Whether a page under the section rooted at `root_slug` may recurse into `child_url`
    ///
    /// Children must start with one of the section's child prefixes or be the
    /// root page itself. Sections without prefixes stay on their root page.
    pub fn child_allowed(&self, root_slug: &str, child_url: &str) -> bool {
        let child_slug = last_path_segment(child_url).to_lowercase();
        if child_slug == root_slug {
            return true;
        }

        self.sections
            .iter()
            .find(|section| section.slug.trim().to_lowercase() == root_slug)
            .map(|section| {
                section
                    .child_slug_prefixes
                    .iter()
                    .any(|prefix| child_slug.starts_with(&prefix.to_lowercase()))
            })
            .unwrap_or(false)
    }
}
