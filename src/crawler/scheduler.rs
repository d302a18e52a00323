//! Frontier queue and politeness pacing
//!
//! This module handles:
//! - The FIFO frontier driving breadth-first traversal
//! - Per-page lifecycle tracking (queued, visited, skipped)
//! - The visited-page cap
//! - Politeness delays (base delay plus random jitter) before each fetch

use crate::config::PacingConfig;
use crate::crawler::fetcher::{duration_from_seconds, random_jitter};
use crate::state::PageState;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// A page waiting in the frontier
///
/// `C` is the crawler-defined routing payload carried alongside the URL
/// (section/year context for document crawls, a breadcrumb for the directory).
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem<C> {
    /// Canonical URL of the page
    pub url: String,

    /// Distance from the seed (seed = 0)
    pub depth: u32,

    /// Page the link was found on; `None` for the seed
    pub discovered_from: Option<String>,

    pub context: C,
}

impl<C> QueueItem<C> {
    /// Creates a depth-0 seed item
    pub fn seed(url: impl Into<String>, context: C) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            discovered_from: None,
            context,
        }
    }

    /// Creates an item one level below `parent`
    pub fn child(parent: &QueueItem<impl Sized>, url: impl Into<String>, context: C) -> Self {
        Self {
            url: url.into(),
            depth: parent.depth + 1,
            discovered_from: Some(parent.url.clone()),
            context,
        }
    }

    pub fn is_seed(&self) -> bool {
        self.discovered_from.is_none()
    }
}

/// Result of asking the frontier for the next page
#[derive(Debug, PartialEq)]
pub enum NextPage<C> {
    /// A page that may be processed now
    Ready(QueueItem<C>),

    /// The visited-page cap was reached; the crawl must stop
    CapReached,

    /// Nothing left to crawl
    Exhausted,
}

/// FIFO frontier with page-state tracking
///
/// Duplicates may be queued; they are collapsed when popped. Once a URL is
/// visited or skipped it is never handed out again.
#[derive(Debug)]
pub struct Frontier<C> {
    queue: VecDeque<QueueItem<C>>,

    states: HashMap<String, PageState>,

    visited: usize,

    max_pages: usize,
}

impl<C> Frontier<C> {
    /// Creates an empty frontier that stops after `max_pages` visits
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            states: HashMap::new(),
            visited: 0,
            max_pages,
        }
    }

    /// Adds an item to the back of the queue
    ///
    /// Returns false (and does nothing) if the URL was already visited or skipped.
    pub fn push(&mut self, item: QueueItem<C>) -> bool {
        if self.state(&item.url).is_terminal() {
            return false;
        }
        self.states.insert(item.url.clone(), PageState::Queued);
        self.queue.push_back(item);
        true
    }

    /// Pops the next page that has not been visited or skipped
    pub fn pop(&mut self) -> NextPage<C> {
        while let Some(item) = self.queue.pop_front() {
            if !self.state(&item.url).is_pending() {
                continue;
            }
            if self.visited >= self.max_pages {
                return NextPage::CapReached;
            }
            return NextPage::Ready(item);
        }
        NextPage::Exhausted
    }

    /// Marks a page as visited and counts it against the cap
    pub fn mark_visited(&mut self, url: &str) {
        if self.states.insert(url.to_string(), PageState::Visited) != Some(PageState::Visited) {
            self.visited += 1;
        }
    }

    /// Marks a page as out of scope so later discoveries ignore it
    pub fn mark_skipped(&mut self, url: &str) {
        self.states
            .entry(url.to_string())
            .and_modify(|state| {
                if !state.is_terminal() {
                    *state = PageState::Skipped;
                }
            })
            .or_insert(PageState::Skipped);
    }

    pub fn state(&self, url: &str) -> PageState {
        self.states.get(url).copied().unwrap_or_default()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.state(url) == PageState::Visited
    }

    /// Number of pages marked visited so far
    pub fn visited_count(&self) -> usize {
        self.visited
    }

    pub fn skipped_count(&self) -> usize {
        self.states
            .values()
            .filter(|state| **state == PageState::Skipped)
            .count()
    }

    /// Items still queued (including duplicates not yet collapsed)
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Base delay plus uniform random jitter applied before every page fetch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Politeness {
    pub delay_seconds: f64,
    pub jitter_seconds: f64,
}

impl Politeness {
    pub fn new(delay_seconds: f64, jitter_seconds: f64) -> Self {
        Self {
            delay_seconds,
            jitter_seconds,
        }
    }

    pub fn from_pacing(pacing: &PacingConfig) -> Self {
        Self::new(pacing.request_delay_seconds, pacing.request_jitter_seconds)
    }

    /// Computes the next delay; never negative
    pub fn next_delay(&self) -> Duration {
        let seconds = self.delay_seconds.max(0.0) + random_jitter(self.jitter_seconds);
        duration_from_seconds(seconds).unwrap_or(Duration::ZERO)
    }

    /// Sleeps for [`Politeness::next_delay`]
    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> QueueItem<()> {
        QueueItem::seed(url, ())
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new(10);
        frontier.push(item("https://example.com/a"));
        frontier.push(item("https://example.com/b"));

        match frontier.pop() {
            NextPage::Ready(next) => assert_eq!(next.url, "https://example.com/a"),
            other => panic!("unexpected {:?}", other),
        }
        match frontier.pop() {
            NextPage::Ready(next) => assert_eq!(next.url, "https://example.com/b"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(frontier.pop(), NextPage::Exhausted);
    }

    #[test]
    fn test_duplicates_collapsed_at_pop() {
        let mut frontier = Frontier::new(10);
        frontier.push(item("https://example.com/a"));
        frontier.push(item("https://example.com/a"));
        assert_eq!(frontier.len(), 2);

        let NextPage::Ready(first) = frontier.pop() else {
            panic!("expected a page");
        };
        frontier.mark_visited(&first.url);

        assert_eq!(frontier.pop(), NextPage::Exhausted);
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_push_after_visit_is_ignored() {
        let mut frontier = Frontier::new(10);
        frontier.mark_visited("https://example.com/a");
        assert!(!frontier.push(item("https://example.com/a")));

        frontier.mark_skipped("https://example.com/b");
        assert!(!frontier.push(item("https://example.com/b")));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_cap_reached() {
        let mut frontier = Frontier::new(1);
        frontier.push(item("https://example.com/a"));
        frontier.push(item("https://example.com/b"));

        let NextPage::Ready(first) = frontier.pop() else {
            panic!("expected a page");
        };
        frontier.mark_visited(&first.url);

        assert_eq!(frontier.pop(), NextPage::CapReached);
    }

    #[test]
    fn test_states() {
        let mut frontier = Frontier::new(10);
        assert_eq!(frontier.state("https://example.com/a"), PageState::Unvisited);

        frontier.push(item("https://example.com/a"));
        assert_eq!(frontier.state("https://example.com/a"), PageState::Queued);

        frontier.mark_skipped("https://example.com/a");
        assert_eq!(frontier.state("https://example.com/a"), PageState::Skipped);
        assert_eq!(frontier.skipped_count(), 1);

        // Skipping never overrides a visit
        frontier.mark_visited("https://example.com/v");
        frontier.mark_skipped("https://example.com/v");
        assert!(frontier.is_visited("https://example.com/v"));
    }

    #[test]
    fn test_mark_visited_twice_counts_once() {
        let mut frontier: Frontier<()> = Frontier::new(10);
        frontier.mark_visited("https://example.com/a");
        frontier.mark_visited("https://example.com/a");
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_child_item() {
        let seed = item("https://example.com/");
        let child = QueueItem::child(&seed, "https://example.com/a", ());
        assert_eq!(child.depth, 1);
        assert_eq!(child.discovered_from.as_deref(), Some("https://example.com/"));
        assert!(seed.is_seed());
        assert!(!child.is_seed());
    }

    #[test]
    fn test_politeness_delay_bounds() {
        let politeness = Politeness::new(0.2, 0.1);
        for _ in 0..50 {
            let delay = politeness.next_delay();
            let seconds = delay.as_secs_f64();
            assert!(seconds >= 0.2 - 1e-6);
            assert!(seconds <= 0.3 + 1e-6);
        }

        assert_eq!(Politeness::new(0.0, 0.0).next_delay(), Duration::ZERO);
        assert_eq!(Politeness::new(-1.0, 0.0).next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_politeness_unrepresentable_delay_is_zero() {
        assert_eq!(Politeness::new(1e300, 0.0).next_delay(), Duration::ZERO);
        assert_eq!(Politeness::new(0.0, 1e300).next_delay(), Duration::ZERO);
        assert_eq!(Politeness::new(f64::NAN, 0.0).next_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_politeness_zero_wait_returns() {
        Politeness::new(0.0, 0.0).wait().await;
    }
}
