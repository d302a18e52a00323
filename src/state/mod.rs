//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: lifecycle of one page in the frontier (unvisited, queued, visited, skipped)

mod page_state;

// Re-export main types
pub use page_state::PageState;
