use crate::url::canonicalize::authority;
use std::collections::HashSet;
use url::Url;

/// Outcome of checking a URL against a crawl [`Scope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeDecision {
    /// Same host and an allowed path - may be fetched
    Allowed,
    /// Different host (or unparseable) - never followed, not remembered
    OtherHost,
    /// Same host but outside the allowed paths - remembered as skipped
    OutOfScope,
}

impl ScopeDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Host and path rules bounding which pages a crawler may fetch
///
/// Path checks run in this order:
/// 1. Excluded prefixes (highest priority)
/// 2. Explicit exact paths
/// 3. Allowed prefixes (an empty list allows every path)
#[derive(Debug, Clone)]
pub struct Scope {
    authority: String,
    explicit_paths: HashSet<String>,
    allowed_prefixes: Vec<String>,
    excluded_prefixes: Vec<String>,
}

impl Scope {
    /// Creates a scope for one `host[:port]` that allows every path
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into().to_ascii_lowercase(),
            explicit_paths: HashSet::new(),
            allowed_prefixes: Vec::new(),
            excluded_prefixes: Vec::new(),
        }
    }

    pub fn with_explicit_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.explicit_paths
            .extend(paths.into_iter().map(|p| normalize_path(p.as_ref())));
        self
    }

    pub fn with_allowed_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn with_excluded_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// The lowercase `host[:port]` this scope is bound to
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn same_host(&self, url: &Url) -> bool {
        authority(url) == self.authority
    }

    /// Checks only the path rules
    pub fn allows_path(&self, path: &str) -> bool {
        if self
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return false;
        }

        if self.explicit_paths.contains(&normalize_path(path)) {
            return true;
        }

        self.allowed_prefixes.is_empty()
            || self
                .allowed_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Classifies a URL string against host and path rules
    pub fn classify(&self, url: &str) -> ScopeDecision {
        let Ok(parsed) = Url::parse(url) else {
            return ScopeDecision::OtherHost;
        };

        if !self.same_host(&parsed) {
            return ScopeDecision::OtherHost;
        }

        if self.allows_path(parsed.path()) {
            ScopeDecision::Allowed
        } else {
            ScopeDecision::OutOfScope
        }
    }

    pub fn allows(&self, url: &str) -> bool {
        self.classify(url).is_allowed()
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
