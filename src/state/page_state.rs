//! Page state definitions for tracking frontier progress
//!
//! A page moves `Unvisited -> Queued -> Visited | Skipped`. Once a page is
//! visited or skipped it is never fetched again during the run.

use std::fmt;

/// Represents the current state of a page in one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageState {
    /// Never seen by the frontier
    #[default]
    Unvisited,

    /// Waiting in the frontier queue (possibly more than once)
    Queued,

    /// Popped and fetched (or attempted)
    Visited,

    /// Popped but outside the crawl scope - remembered so it is not reconsidered
    Skipped,
}

impl PageState {
    /// Returns true if the page has been settled and must not be fetched again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited | Self::Skipped)
    }

    /// Returns true if the page may still be fetched
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Unvisited | Self::Queued)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Queued => "queued",
            Self::Visited => "visited",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
