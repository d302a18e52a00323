//! HTML link extraction
//!
//! This module handles parsing HTML content to extract:
//! - Anchors with their resolved href and visible text
//! - Anchors scoped to one container element (by id), with a whole-page fallback
//! - Document URLs mentioned outside anchors (scripts, data attributes)
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and the
//! parsed document never outlives the call.

use regex::RegexBuilder;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// An anchor found in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlLink {
    /// href resolved against the page URL (not yet canonicalized)
    pub href: String,

    /// Concatenated text of the anchor, trimmed
    pub text: String,
}

/// Extracts every anchor with a non-empty href from the page
///
/// # Example
///
/// ```
/// use hkgov_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/a.pdf">Annual <b>Report</b></a></body></html>"#;
/// let base_url = Url::parse("https://example.com/en/index.html").unwrap();
/// let links = extract_links(html, &base_url);
/// assert_eq!(links[0].href, "https://example.com/a.pdf");
/// assert_eq!(links[0].text, "Annual Report");
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<HtmlLink> {
    let document = Html::parse_document(html);
    anchors_under(document.root_element(), base_url)
}

/// Extracts anchors that are descendants of the first element whose id is `element_id`
///
/// Returns an empty list when no such element exists.
pub fn extract_links_in_element(html: &str, base_url: &Url, element_id: &str) -> Vec<HtmlLink> {
    let document = Html::parse_document(html);
    match find_by_id(&document, element_id) {
        Some(container) => anchors_under(container, base_url),
        None => Vec::new(),
    }
}

/// Scoped extraction with the required fallback to the whole page
///
/// When `element_id` is `None`, or the scoped search finds no anchors, every
/// anchor in the page is returned instead.
pub fn extract_links_scoped(html: &str, base_url: &Url, element_id: Option<&str>) -> Vec<HtmlLink> {
    let document = Html::parse_document(html);

    if let Some(id) = element_id {
        if let Some(container) = find_by_id(&document, id) {
            let scoped = anchors_under(container, base_url);
            if !scoped.is_empty() {
                return scoped;
            }
        }
    }

    anchors_under(document.root_element(), base_url)
}

/// Keeps links whose text and href contain the given substrings (case-insensitive)
pub fn filter_links(
    links: Vec<HtmlLink>,
    text_contains: Option<&str>,
    href_contains: Option<&str>,
) -> Vec<HtmlLink> {
    let text_needle = text_contains
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let href_needle = href_contains
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    links
        .into_iter()
        .filter(|link| {
            text_needle
                .as_ref()
                .map_or(true, |needle| link.text.to_lowercase().contains(needle))
        })
        .filter(|link| {
            href_needle
                .as_ref()
                .map_or(true, |needle| link.href.to_lowercase().contains(needle))
        })
        .collect()
}

/// Finds document URLs anywhere in the raw HTML, including outside anchors
///
/// Matches absolute (`http(s)://`) and root-relative (`/...`) URLs ending in
/// one of `exts`, with an optional query string. `&amp;` is decoded, trailing
/// punctuation is trimmed and results are de-duplicated in first-seen order.
pub fn scan_document_urls(html: &str, base_url: &Url, exts: &[String]) -> Vec<String> {
    let alternatives: Vec<String> = exts
        .iter()
        .map(|ext| regex::escape(ext.trim_start_matches('.')))
        .filter(|ext| !ext.is_empty())
        .collect();
    if alternatives.is_empty() {
        return Vec::new();
    }

    let pattern = format!(
        r#"((?:https?://|/)[^"'<>\s]+?\.(?:{})(?:\?[^"'<>\s]*)?)"#,
        alternatives.join("|")
    );
    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for m in re.find_iter(html) {
        let raw = m.as_str().trim().replace("&amp;", "&");
        let trimmed = raw.trim_end_matches(|c: char| {
            matches!(c, ')' | ']' | '.' | ',' | ';' | '"' | '\'' | '\u{bb}' | '\u{2019}' | '\u{201d}')
        });
        if trimmed.is_empty() {
            continue;
        }

        let absolute = if trimmed.starts_with('/') {
            match base_url.join(trimmed) {
                Ok(url) => url.to_string(),
                Err(_) => continue,
            }
        } else {
            trimmed.to_string()
        };

        if seen.insert(absolute.clone()) {
            out.push(absolute);
        }
    }

    out
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Finds the first element carrying `id="element_id"` in document order
fn find_by_id<'a>(document: &'a Html, element_id: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("[id]").ok()?;
    document
        .select(&selector)
        .find(|element| element.value().id() == Some(element_id))
}

fn anchors_under(root: ElementRef<'_>, base_url: &Url) -> Vec<HtmlLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    root.select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let resolved = base_url.join(href).ok()?;
            let text = anchor.text().collect::<String>().trim().to_string();
            Some(HtmlLink {
                href: resolved.to_string(),
                text,
            })
        })
        .collect()
}
