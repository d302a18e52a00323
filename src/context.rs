//! Process-wide run context
//!
//! Built once at startup and passed by reference to every crawler. Nothing in
//! it changes during the run.

use crate::config::Settings;
use crate::ConfigError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Read-only context shared by every crawler in a run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// UTC date of the run, `YYYY-MM-DD`
    pub run_date_utc: String,

    /// RFC 3339 start timestamp, used as `discovered_at_utc` for every record
    pub started_at_utc: String,

    pub settings: Settings,

    /// Verbose per-page logging
    pub debug: bool,
}

impl RunContext {
    /// Creates a context starting now
    ///
    /// `run_date` defaults to today's UTC date.
    pub fn new(settings: Settings, run_date: Option<NaiveDate>, debug: bool) -> Self {
        Self::at(Utc::now(), settings, run_date, debug)
    }

    /// Creates a context with an explicit start time
    pub fn at(
        started_at: DateTime<Utc>,
        settings: Settings,
        run_date: Option<NaiveDate>,
        debug: bool,
    ) -> Self {
        let run_date = run_date.unwrap_or_else(|| started_at.date_naive());
        Self {
            run_date_utc: run_date.format("%Y-%m-%d").to_string(),
            started_at_utc: started_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            settings,
            debug,
        }
    }
}

/// Parses a `--run-date` value (`YYYY-MM-DD`)
pub fn parse_run_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ConfigError::Validation(format!(
            "run date '{}' is not a valid YYYY-MM-DD date: {}",
            value, e
        ))
    })
}
