//! State module for tracking crawl progress
//!
//! Every row in the persistent frontier carries one of these states, stored as
//! a lowercase string in SQLite.
//!
//! # Components
//!
//! - `UrlStatus`: lifecycle of a queued page (pending, done, error, blocked, gone)
//! - `SitemapStatus`: lifecycle of a sitemap record (pending, done, error)
//! - `UrlType`: classification of a URL (product, category, other)

mod queue_state;

// Re-export main types
pub use queue_state::{SitemapStatus, UrlStatus, UrlType};
