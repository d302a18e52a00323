//! Output module for emitted records and run artifacts
//!
//! This module handles:
//! - The `UrlRecord` emitted by every crawler and the in-memory `RecordSink`
//! - Writing records as JSON Lines with a summary and a hashed manifest
//! - Recording per-crawler statistics

mod jsonl;
mod record;
pub mod stats;

pub use jsonl::{
    sha256_file, write_json, write_jsonl, write_run_outputs, Manifest, ManifestEntry,
    RunOutputs, RunSummary, SCHEMA_VERSION,
};
pub use record::{sort_records, RecordSink, UrlRecord};
pub use stats::{print_statistics, CrawlStats, StopReason};

/// Records and statistics produced by one crawler
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub records: Vec<UrlRecord>,
    pub stats: CrawlStats,
}

impl CrawlOutcome {
    /// Builds an outcome from a sink, sorting its records by URL
    pub fn from_sink(sink: RecordSink, mut stats: CrawlStats) -> Self {
        let records = sink.into_sorted();
        stats.records = records.len();
        Self { records, stats }
    }
}
