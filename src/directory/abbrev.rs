//! Post-title abbreviation expansion
//!
//! The dictionary is a JSON object mapping short forms to long forms. Only
//! abbreviations starting with an uppercase letter are used, and they are
//! matched as whole tokens (bounded by non-alphanumeric characters), longest
//! first, so "Dir" never matches inside "Director".

use crate::crawler::collapse_whitespace;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// One abbreviation applied while expanding a title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedAbbreviation {
    pub short: String,
    pub long: String,
}

/// Short-to-long dictionary with a longest-first match order
#[derive(Debug, Clone, Default)]
pub struct Abbreviations {
    /// Sorted by short form length, longest first
    entries: Vec<(String, String)>,
}

impl Abbreviations {
    /// Builds the dictionary, dropping blank entries and lowercase-initial short forms
    pub fn new(map: HashMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = map
            .into_iter()
            .map(|(short, long)| (collapse_whitespace(&short), collapse_whitespace(&long)))
            .filter(|(short, long)| !short.is_empty() && !long.is_empty())
            .filter(|(short, _)| short.chars().next().is_some_and(char::is_uppercase))
            .collect();

        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Loads a JSON dictionary; a missing or invalid file yields an empty one
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Abbreviations file {} not loaded: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&content) {
            Ok(raw) => Self::new(
                raw.into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k, v.to_string())))
                    .collect(),
            ),
            Err(e) => {
                warn!("Abbreviations file {} is not a JSON object: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Expands every whole-token abbreviation in `title`
    ///
    /// Returns the expanded title and the abbreviations used, each listed once
    /// in order of first use.
    pub fn expand(&self, title: &str) -> (String, Vec<AppliedAbbreviation>) {
        let title = title.trim();
        let mut used: Vec<AppliedAbbreviation> = Vec::new();
        if self.entries.is_empty() {
            return (title.to_string(), used);
        }

        let mut out = String::with_capacity(title.len());
        let mut prev: Option<char> = None;
        let mut i = 0;

        while i < title.len() {
            let rest = &title[i..];
            let at_boundary = !prev.is_some_and(|c| c.is_ascii_alphanumeric());

            let hit = at_boundary
                .then(|| {
                    self.entries.iter().find(|(short, _)| {
                        rest.starts_with(short.as_str())
                            && !rest[short.len()..]
                                .chars()
                                .next()
                                .is_some_and(|c| c.is_ascii_alphanumeric())
                    })
                })
                .flatten();

            if let Some((short, long)) = hit {
                out.push_str(long);
                if !used.iter().any(|a| &a.short == short) {
                    used.push(AppliedAbbreviation {
                        short: short.clone(),
                        long: long.clone(),
                    });
                }
                prev = short.chars().last();
                i += short.len();
                continue;
            }

            if let Some(c) = rest.chars().next() {
                out.push(c);
                prev = Some(c);
                i += c.len_utf8();
            }
        }

        (out, used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dictionary() -> Abbreviations {
        Abbreviations::new(HashMap::from([
            ("Dir".to_string(), "Director".to_string()),
            ("Asst".to_string(), "Assistant".to_string()),
            ("Asst Dir".to_string(), "Assistant Director".to_string()),
            ("Acct(s)".to_string(), "Account(s)".to_string()),
            ("mgr".to_string(), "manager".to_string()),
            ("  ".to_string(), "blank".to_string()),
        ]))
    }

    #[test]
    fn test_new_filters_entries() {
        // lowercase-initial and blank short forms are dropped
        assert_eq!(dictionary().len(), 4);
    }

    #[test]
    fn test_longest_match_first() {
        let (expanded, used) = dictionary().expand("Asst Dir (Works)");
        assert_eq!(expanded, "Assistant Director (Works)");
        assert_eq!(
            used,
            vec![AppliedAbbreviation {
                short: "Asst Dir".to_string(),
                long: "Assistant Director".to_string()
            }]
        );
    }

    #[test]
    fn test_whole_token_only() {
        let (expanded, used) = dictionary().expand("Director of Dirt Roads");
        assert_eq!(expanded, "Director of Dirt Roads");
        assert!(used.is_empty());

        let (expanded, _) = dictionary().expand("Snr Acct(s) Officer");
        assert_eq!(expanded, "Snr Account(s) Officer");

        let (expanded, _) = dictionary().expand("Dir/Asst");
        assert_eq!(expanded, "Director/Assistant");
    }

    #[test]
    fn test_each_abbreviation_listed_once() {
        let (expanded, used) = dictionary().expand("Dir, Dir");
        assert_eq!(expanded, "Director, Director");
        assert_eq!(used.len(), 1);
    }

    #[test]
    fn test_empty_dictionary_returns_trimmed_title() {
        let (expanded, used) = Abbreviations::default().expand("  Clerk ");
        assert_eq!(expanded, "Clerk");
        assert!(used.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abbrev.json");
        std::fs::write(&path, r#"{"Dir": "Director", "Bad": 3}"#).unwrap();
        assert_eq!(Abbreviations::load(&path).len(), 1);

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(Abbreviations::load(&path).is_empty());

        assert!(Abbreviations::load(&dir.path().join("missing.json")).is_empty());
    }
}
