//! URL handling module
//!
//! This module provides URL canonicalization, host/extension helpers and the
//! host-and-path [`Scope`] rules used by every crawler.

mod canonicalize;
mod scope;

// Re-export main functions
pub use canonicalize::{
    authority, authority_of, canonicalize, infer_name_from_link, last_path_segment, path_ext,
    CanonicalizeOptions,
};
pub use scope::{Scope, ScopeDecision};

/// Resolves an href against a base URL and canonicalizes the result
///
/// Rejected pseudo-schemes are filtered before joining so that
/// `javascript:` links never resolve into something fetchable.
///
/// # Examples
///
/// ```
/// use hkgov_crawler::url::{resolve_and_canonicalize, CanonicalizeOptions};
/// use url::Url;
///
/// let base = Url::parse("https://example.com/en/index.html").unwrap();
/// let opts = CanonicalizeOptions::default();
/// assert_eq!(
///     resolve_and_canonicalize(&base, "docs/a.pdf#page=2", &opts).as_deref(),
///     Some("https://example.com/en/docs/a.pdf")
/// );
/// ```
pub fn resolve_and_canonicalize(
    base: &url::Url,
    href: &str,
    options: &CanonicalizeOptions,
) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let lowered = href.to_ascii_lowercase();
    if options
        .reject_schemes
        .iter()
        .any(|scheme| lowered.starts_with(&format!("{}:", scheme.to_ascii_lowercase())))
    {
        return None;
    }

    let joined = base.join(href).ok()?;
    canonicalize(joined.as_str(), options)
}
