use url::Url;

/// Options controlling [`canonicalize`]
///
/// Scheme and host are always lowercased; the URL parser does this for every
/// special scheme, so there is no switch for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizeOptions {
    /// Pseudo-schemes rejected before parsing (compared case-insensitively)
    pub reject_schemes: Vec<String>,

    /// Percent-encode literal spaces before parsing
    pub encode_spaces: bool,

    pub strip_fragment: bool,

    /// Remove trailing slashes from every non-root path
    pub trim_trailing_slash: bool,

    /// Only accept URLs whose host (or `host:port`) equals this value
    pub allowed_host: Option<String>,
}

impl Default for CanonicalizeOptions {
    fn default() -> Self {
        Self {
            reject_schemes: vec![
                "javascript".to_string(),
                "mailto".to_string(),
                "tel".to_string(),
            ],
            encode_spaces: false,
            strip_fragment: true,
            trim_trailing_slash: true,
            allowed_host: None,
        }
    }
}

impl CanonicalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_host = Some(host.into());
        self
    }

    pub fn with_encode_spaces(mut self, encode: bool) -> Self {
        self.encode_spaces = encode;
        self
    }

    pub fn with_strip_fragment(mut self, strip: bool) -> Self {
        self.strip_fragment = strip;
        self
    }

    pub fn with_trim_trailing_slash(mut self, trim: bool) -> Self {
        self.trim_trailing_slash = trim;
        self
    }

    pub fn with_reject_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reject_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonicalizes an absolute URL into the form used as record and dedup identity
///
/// # Canonicalization Steps
///
/// 1. Trim whitespace; empty input is rejected
/// 2. Optionally percent-encode literal spaces
/// 3. Reject configured pseudo-schemes (`javascript:`, `mailto:`, `tel:`)
/// 4. Parse; reject anything without a scheme and host (including unresolved relative hrefs)
/// 5. Optionally restrict to one host
/// 6. Strip the fragment
/// 7. Empty path becomes `/`; trailing slashes are removed from non-root paths
///
/// The query string is kept as-is. Applying the function to its own output
/// returns the same string.
///
/// # Returns
///
/// * `Some(String)` - The canonical absolute URL
/// * `None` - The input was rejected
///
/// # Examples
///
/// ```
/// use hkgov_crawler::url::{canonicalize, CanonicalizeOptions};
///
/// let opts = CanonicalizeOptions::default();
/// assert_eq!(
///     canonicalize("HTTP://Example.com/a/#top", &opts).as_deref(),
///     Some("http://example.com/a")
/// );
/// assert_eq!(canonicalize("mailto:someone@example.com", &opts), None);
/// ```
pub fn canonicalize(raw: &str, options: &CanonicalizeOptions) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if options.encode_spaces {
        trimmed.replace(' ', "%20")
    } else {
        trimmed.to_string()
    };

    let lowered = candidate.to_ascii_lowercase();
    if options
        .reject_schemes
        .iter()
        .any(|scheme| lowered.starts_with(&format!("{}:", scheme.to_ascii_lowercase())))
    {
        return None;
    }

    let mut url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    if let Some(allowed) = &options.allowed_host {
        let allowed = allowed.trim().to_ascii_lowercase();
        if allowed != host && allowed != authority(&url) {
            return None;
        }
    }

    if options.strip_fragment {
        url.set_fragment(None);
    }

    if options.trim_trailing_slash {
        let path = url.path();
        if path != "/" && path.ends_with('/') {
            let trimmed_path = path.trim_end_matches('/');
            let normalized = if trimmed_path.is_empty() {
                "/".to_string()
            } else {
                trimmed_path.to_string()
            };
            url.set_path(&normalized);
        }
    }

    if url.path().is_empty() {
        url.set_path("/");
    }

    Some(url.to_string())
}

/// Lowercase `host[:port]` of a parsed URL, used for every same-host comparison
pub fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// [`authority`] for a URL string; `None` when it does not parse
pub fn authority_of(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| authority(&u))
}

/// Last non-empty path segment of a URL, still percent-encoded
pub fn last_path_segment(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_default()
}

/// Lowercase extension (with the dot) of the last path segment, or "" when there is none
///
/// # Examples
///
/// ```
/// use hkgov_crawler::url::path_ext;
///
/// assert_eq!(path_ext("https://example.com/files/Report.PDF?x=1"), ".pdf");
/// assert_eq!(path_ext("https://example.com/files/"), "");
/// ```
pub fn path_ext(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let segment = parsed.path().rsplit('/').next().unwrap_or_default();
    match segment.rfind('.') {
        Some(idx) if idx + 1 < segment.len() => segment[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Best label for a link: its collapsed text, else the decoded last path segment
pub fn infer_name_from_link(text: &str, url: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        return Some(collapsed);
    }

    let segment = last_path_segment(url);
    if segment.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    let decoded = decoded.trim();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> Option<String> {
        canonicalize(raw, &CanonicalizeOptions::default())
    }

    #[test]
    fn test_fragment_slash_and_case_invariance() {
        let expected = Some("http://example.com/a".to_string());
        assert_eq!(canon("HTTP://Example.com/a/"), expected);
        assert_eq!(canon("http://example.com/a#frag"), expected);
        assert_eq!(canon("http://example.com/a"), expected);
    }

    #[test]
    fn test_rejects_pseudo_schemes() {
        assert_eq!(canon("javascript:void(0)"), None);
        assert_eq!(canon("mailto:a@b.com"), None);
        assert_eq!(canon("tel:+852123"), None);
        assert_eq!(canon("JavaScript:alert(1)"), None);
    }

    #[test]
    fn test_rejects_empty_and_relative() {
        assert_eq!(canon(""), None);
        assert_eq!(canon("   "), None);
        assert_eq!(canon("/en/page.html"), None);
        assert_eq!(canon("page.html"), None);
        assert_eq!(canon("data:text/plain,hello"), None);
    }

    #[test]
    fn test_all_trailing_slashes_stripped() {
        let once = canon("https://example.com/en/docs//").unwrap();
        assert_eq!(once, "https://example.com/en/docs");
        assert_eq!(canon(&once).as_deref(), Some(once.as_str()));
        assert_eq!(
            canon("https://example.com/en/docs/").as_deref(),
            Some("https://example.com/en/docs")
        );
    }

    #[test]
    fn test_root_keeps_slash() {
        assert_eq!(canon("https://example.com").as_deref(), Some("https://example.com/"));
        assert_eq!(canon("https://example.com/").as_deref(), Some("https://example.com/"));
        assert_eq!(canon("https://example.com//").as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_query_preserved() {
        assert_eq!(
            canon("https://example.com/list/?b=2&a=1#x").as_deref(),
            Some("https://example.com/list?b=2&a=1")
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "HTTP://Example.com/a/",
            "https://example.com//",
            "https://example.com/a//b///",
            "https://example.com/a b/c.pdf?q=1 2",
            "https://EXAMPLE.com:8080/x/?y#z",
            "https://example.com/%E6%96%87%E4%BB%B6.pdf",
        ];
        for input in inputs {
            let once = canon(input).unwrap();
            assert_eq!(canon(&once).as_deref(), Some(once.as_str()), "{}", input);
        }
    }

    #[test]
    fn test_encode_spaces() {
        let opts = CanonicalizeOptions::default().with_encode_spaces(true);
        assert_eq!(
            canonicalize("https://example.com/My File.pdf", &opts).as_deref(),
            Some("https://example.com/My%20File.pdf")
        );
    }

    #[test]
    fn test_allowed_host() {
        let opts = CanonicalizeOptions::default().with_allowed_host("Example.com");
        assert!(canonicalize("https://EXAMPLE.COM/a", &opts).is_some());
        assert!(canonicalize("https://other.com/a", &opts).is_none());

        let with_port = CanonicalizeOptions::default().with_allowed_host("127.0.0.1:8080");
        assert!(canonicalize("http://127.0.0.1:8080/a", &with_port).is_some());
        assert!(canonicalize("http://127.0.0.1:9090/a", &with_port).is_none());
    }

    #[test]
    fn test_optional_steps_can_be_disabled() {
        let opts = CanonicalizeOptions::default()
            .with_strip_fragment(false)
            .with_trim_trailing_slash(false);
        assert_eq!(
            canonicalize("https://example.com/a/#x", &opts).as_deref(),
            Some("https://example.com/a/#x")
        );

        let permissive = CanonicalizeOptions::default().with_reject_schemes(Vec::<String>::new());
        assert_eq!(canonicalize("mailto:a@b.com", &permissive), None);
    }

    #[test]
    fn test_path_ext() {
        assert_eq!(path_ext("https://example.com/a/b.pdf"), ".pdf");
        assert_eq!(path_ext("https://example.com/a/B.DocX"), ".docx");
        assert_eq!(path_ext("https://example.com/a/b.pdf?download=1"), ".pdf");
        assert_eq!(path_ext("https://example.com/a/b"), "");
        assert_eq!(path_ext("https://example.com/"), "");
        assert_eq!(path_ext("https://example.com/a.dir/b"), "");
        assert_eq!(path_ext("not a url"), "");
    }

    #[test]
    fn test_authority() {
        let url = Url::parse("https://WWW.Example.com:8443/a").unwrap();
        assert_eq!(authority(&url), "www.example.com:8443");
        assert_eq!(authority_of("https://example.com/a").as_deref(), Some("example.com"));
        assert_eq!(authority_of("nope"), None);
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(
            last_path_segment("https://example.com/en/general-specifications.html"),
            "general-specifications.html"
        );
        assert_eq!(last_path_segment("https://example.com/en/dir/"), "dir");
        assert_eq!(last_path_segment("https://example.com/"), "");
    }

    #[test]
    fn test_infer_name_from_link() {
        assert_eq!(
            infer_name_from_link("  General\n  Specification ", "https://example.com/a.pdf")
                .as_deref(),
            Some("General Specification")
        );
        assert_eq!(
            infer_name_from_link("", "https://example.com/docs/Annual%20Report.pdf").as_deref(),
            Some("Annual Report.pdf")
        );
        assert_eq!(infer_name_from_link("", "https://example.com/"), None);
    }
}
