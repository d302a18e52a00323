use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One discovered URL (document, page or contact) emitted by a crawler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Canonical absolute URL
    pub url: String,

    /// Human-readable label
    pub name: Option<String>,

    /// Run start timestamp shared by every record of the run
    pub discovered_at_utc: String,

    /// Name of the crawler that emitted the record
    pub source: String,

    /// Crawler-specific metadata
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl UrlRecord {
    pub fn new(
        url: impl Into<String>,
        name: Option<String>,
        discovered_at_utc: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            name,
            discovered_at_utc: discovered_at_utc.into(),
            source: source.into(),
            meta: Map::new(),
        }
    }

    /// Adds one metadata entry (builder style)
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<Value>) {
        self.meta.insert(key.to_string(), value.into());
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

/// In-memory accumulator for emitted records
///
/// An optional limit caps the number of accepted records; once full, further
/// pushes are rejected and the caller is expected to stop crawling.
#[derive(Debug, Default)]
pub struct RecordSink {
    records: Vec<UrlRecord>,
    limit: Option<usize>,
}

impl RecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Accepts a record unless the sink is full; returns whether it was stored
    pub fn push(&mut self, record: UrlRecord) -> bool {
        if self.is_full() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.records.len() >= limit)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[UrlRecord] {
        &self.records
    }

    /// Consumes the sink, returning records sorted by URL (stable)
    pub fn into_sorted(self) -> Vec<UrlRecord> {
        let mut records = self.records;
        records.sort_by(|a, b| a.url.cmp(&b.url));
        records
    }
}

/// Sorts records from several crawlers by `(url, source)`
pub fn sort_records(records: &mut [UrlRecord]) {
    records.sort_by(|a, b| a.url.cmp(&b.url).then_with(|| a.source.cmp(&b.source)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(url: &str, source: &str) -> UrlRecord {
        UrlRecord::new(url, None, "2024-01-01T00:00:00Z", source)
    }

    #[test]
    fn test_into_sorted_by_url() {
        let mut sink = RecordSink::new();
        sink.push(record("https://example.com/c.pdf", "a"));
        sink.push(record("https://example.com/a.pdf", "a"));
        sink.push(record("https://example.com/b.pdf", "a"));

        let urls: Vec<String> = sink.into_sorted().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.pdf",
                "https://example.com/b.pdf",
                "https://example.com/c.pdf"
            ]
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_urls() {
        let mut sink = RecordSink::new();
        sink.push(record("https://example.com/x", "second").with_meta("n", 1));
        sink.push(record("https://example.com/x", "first").with_meta("n", 2));

        let sorted = sink.into_sorted();
        assert_eq!(sorted[0].meta["n"], json!(1));
        assert_eq!(sorted[1].meta["n"], json!(2));
    }

    #[test]
    fn test_limit() {
        let mut sink = RecordSink::with_limit(2);
        assert!(sink.push(record("https://example.com/1", "a")));
        assert!(!sink.is_full());
        assert!(sink.push(record("https://example.com/2", "a")));
        assert!(sink.is_full());
        assert!(!sink.push(record("https://example.com/3", "a")));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_sort_records_by_url_then_source() {
        let mut records = vec![
            record("https://example.com/b", "x"),
            record("https://example.com/a", "z"),
            record("https://example.com/a", "y"),
        ];
        sort_records(&mut records);
        let keys: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.url.as_str(), r.source.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("https://example.com/a", "y"),
                ("https://example.com/a", "z"),
                ("https://example.com/b", "x"),
            ]
        );
    }

    #[test]
    fn test_meta_helpers() {
        let mut rec = record("https://example.com/a", "s").with_meta("section", "General");
        rec.set_meta("depth", 2);
        assert_eq!(rec.meta_str("section"), Some("General"));
        assert_eq!(rec.meta["depth"], json!(2));
        assert_eq!(rec.meta_str("depth"), None);
    }
}
