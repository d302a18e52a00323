//! Directory page scope and department breadcrumbs
//!
//! Breadcrumbs come from two places:
//! - The office tree widget (`div.whole-list`), which maps each listed page
//!   to its full breadcrumb. This is authoritative when present.
//! - Link text, appended to the parent page's breadcrumb when it is a
//!   meaningful label.

use crate::crawler::{collapse_whitespace, element_text};
use crate::url::{authority_of, canonicalize, CanonicalizeOptions};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

/// A-Z / 0-9 index labels such as `A`, `0-9` or `A - Z`
static ALPHA_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z]|[0-9])(?:\s*[-\u{2013}]\s*(?:[A-Z]|[0-9]))*$")
        .expect("hardcoded regex is valid")
});

const SKIP_SEGMENTS: [&str; 6] = [
    "back",
    "help",
    "disclaimer",
    "copyright notice",
    "skip to content",
    "govhk",
];

/// Which URLs are crawlable directory pages
#[derive(Debug, Clone)]
pub struct DirectoryPages {
    canon: CanonicalizeOptions,
    page_suffix: String,
    excluded_fragments: Vec<String>,
}

impl DirectoryPages {
    /// Scope bound to the host of `index_url`; `None` if it has no host
    pub fn new(index_url: &str, page_suffix: &str, excluded_fragments: &[String]) -> Option<Self> {
        let authority = authority_of(index_url.trim())?;
        if authority.is_empty() {
            return None;
        }
        Some(Self {
            canon: CanonicalizeOptions::default().with_allowed_host(authority),
            page_suffix: page_suffix.to_lowercase(),
            excluded_fragments: excluded_fragments.iter().map(|f| f.to_lowercase()).collect(),
        })
    }

    /// Canonical form of a URL on the directory host
    pub fn canonical(&self, url: &str) -> Option<String> {
        canonicalize(url, &self.canon)
    }

    /// Canonical form of a crawlable directory page, or `None`
    pub fn crawlable(&self, url: &str) -> Option<String> {
        let canonical = self.canonical(url)?;
        let path = Url::parse(&canonical).ok()?.path().to_lowercase();
        if !path.ends_with(&self.page_suffix) {
            return None;
        }
        if self
            .excluded_fragments
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
        {
            return None;
        }
        Some(canonical)
    }
}

/// Cleans link text into a breadcrumb label, rejecting navigation artifacts
///
/// # Examples
///
/// ```
/// use hkgov_crawler::directory::clean_department_segment;
///
/// assert_eq!(clean_department_segment("  Works   Branch "), Some("Works Branch".to_string()));
/// assert_eq!(clean_department_segment("A - Z"), None);
/// assert_eq!(clean_department_segment("Back"), None);
/// ```
pub fn clean_department_segment(text: &str) -> Option<String> {
    let text = collapse_whitespace(text);
    if text.is_empty() || ALPHA_INDEX.is_match(&text) {
        return None;
    }

    let lower = text.to_lowercase();
    if SKIP_SEGMENTS.contains(&lower.as_str()) || lower.starts_with("skip to") {
        return None;
    }
    Some(text)
}

/// Breadcrumb for a page reached through a link with `link_text`
///
/// The cleaned label is appended unless it repeats the last level
/// (case-insensitively).
pub fn extend_path(path: &[String], link_text: &str) -> Vec<String> {
    match clean_department_segment(link_text) {
        Some(segment)
            if !path
                .last()
                .is_some_and(|last| last.trim().to_lowercase() == segment.to_lowercase()) =>
        {
            let mut next = path.to_vec();
            next.push(segment);
            next
        }
        _ => path.to_vec(),
    }
}

/// Maps each page listed in the office tree to its full breadcrumb
///
/// The breadcrumb level of an anchor is the number of `ul` elements
/// enclosing it inside the first `div.whole-list`. A label stays on the
/// breadcrumb only while its `ul` is an ancestor of the current anchor.
pub fn office_tree_paths(
    document: &Html,
    base_url: &Url,
    pages: &DirectoryPages,
) -> HashMap<String, Vec<String>> {
    let mut paths = HashMap::new();

    let Some(container) = find_whole_list(document) else {
        return paths;
    };
    let Ok(anchors) = Selector::parse("a[href]") else {
        return paths;
    };

    // (enclosing ul, label) per breadcrumb level
    let mut stack: Vec<(ElementRef<'_>, String)> = Vec::new();

    for anchor in container.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(target) = base_url
            .join(href.trim())
            .ok()
            .and_then(|joined| pages.crawlable(joined.as_str()))
        else {
            continue;
        };

        let chain = enclosing_lists(anchor, container);
        let depth = chain.len();
        let label = element_text(anchor);
        if label.is_empty() || depth == 0 {
            continue;
        }

        let still_open = stack
            .iter()
            .zip(chain.iter())
            .take_while(|(entry, open)| entry.0 == **open)
            .count();
        stack.truncate(still_open);

        while stack.len() < depth - 1 {
            stack.push((chain[stack.len()], String::new()));
        }
        stack.truncate(depth - 1);
        stack.push((chain[depth - 1], label));

        paths.insert(
            target,
            stack
                .iter()
                .map(|(_, label)| label.clone())
                .filter(|label| !label.is_empty())
                .collect(),
        );
    }

    paths
}

fn find_whole_list(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("div[class]").ok()?;
    document.select(&selector).find(|div| {
        div.value()
            .attr("class")
            .is_some_and(|class| class.to_lowercase().contains("whole-list"))
    })
}

/// `ul` ancestors of `element` below `container`, outermost first
fn enclosing_lists<'a>(element: ElementRef<'a>, container: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut chain: Vec<ElementRef<'a>> = element
        .ancestors()
        .take_while(|node| node.id() != container.id())
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case("ul"))
        .collect();
    chain.reverse();
    chain
}
