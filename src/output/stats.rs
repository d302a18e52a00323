//! Per-crawler statistics
//!
//! Every crawler returns a [`CrawlStats`] alongside its records. The runner
//! logs them and folds them into `summary.json`.

use serde::Serialize;
use std::fmt;

/// Why a crawler stopped before its frontier was exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The visited-page cap was reached
    MaxPages,

    /// The record cap was reached
    MaxRecords,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxPages => write!(f, "max pages reached"),
            Self::MaxRecords => write!(f, "max records reached"),
        }
    }
}

/// Counters collected during one crawler run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlStats {
    pub crawler: String,

    /// Pages fetched successfully
    pub pages_fetched: usize,

    /// Pages whose fetch failed and were skipped
    pub pages_failed: usize,

    /// Same-host pages rejected by the scope rules
    pub pages_out_of_scope: usize,

    pub records: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_by: Option<StopReason>,
}

impl CrawlStats {
    pub fn new(crawler: impl Into<String>) -> Self {
        Self {
            crawler: crawler.into(),
            ..Self::default()
        }
    }

    /// Share of attempted pages that were fetched successfully, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_fetched + self.pages_failed;
        if attempted == 0 {
            0.0
        } else {
            (self.pages_fetched as f64 / attempted as f64) * 100.0
        }
    }

    /// Logs a one-line summary at info level
    pub fn log(&self) {
        match self.stopped_by {
            Some(reason) => tracing::info!("[{}] stopped early ({}): {}", self.crawler, reason, self),
            None => tracing::info!("[{}] finished: {}", self.crawler, self),
        }
    }
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} pages fetched, {} failed, {} out of scope ({:.1}% success)",
            self.records,
            self.pages_fetched,
            self.pages_failed,
            self.pages_out_of_scope,
            self.success_rate()
        )
    }
}

/// Prints per-crawler statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[CrawlStats]) {
    println!("=== Crawl Statistics ===\n");

    for entry in stats {
        println!("{}:", entry.crawler);
        println!("  Records: {}", entry.records);
        println!("  Pages fetched: {}", entry.pages_fetched);
        println!("  Pages failed: {}", entry.pages_failed);
        println!("  Pages out of scope: {}", entry.pages_out_of_scope);
        if let Some(reason) = entry.stopped_by {
            println!("  Stopped early: {}", reason);
        }
        println!();
    }

    let total: usize = stats.iter().map(|s| s.records).sum();
    println!("Total records: {}", total);
}
