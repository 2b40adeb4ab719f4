//! Queue state definitions for the persistent frontier
//!
//! Status and type values are persisted as plain strings, so the string forms
//! below are part of the database contract.

use std::fmt;

/// Represents the current state of a URL in the crawl queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlStatus {
    /// Waiting to be fetched
    Pending,

    // ===== Terminal States =====
    /// Fetched and processed successfully
    Done,

    /// Returned HTTP 404 or 410; never retried automatically
    Gone,

    // ===== Resumable States =====
    /// Network failure or non-404 HTTP error; retried after `reset_errors`
    Error,

    /// An anti-bot challenge page was served; retried after `reset_errors`
    Blocked,
}

impl UrlStatus {
    /// Returns true if a normal run never revisits this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Gone)
    }

    /// Returns true if `reset_errors` moves this state back to pending
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Error | Self::Blocked)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Gone => "gone",
            Self::Error => "error",
            Self::Blocked => "blocked",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "gone" => Some(Self::Gone),
            "error" => Some(Self::Error),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Represents the state of a sitemap record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitemapStatus {
    Pending,
    Done,
    Error,
}

impl SitemapStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SitemapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Classification of a normalized URL for a given site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlType {
    /// A product detail page carrying a SKU
    Product,
    /// A listing page whose links lead to products
    Category,
    /// Anything else; never enqueued
    Other,
}

impl UrlType {
    /// Returns true if URLs of this type belong in the crawl queue
    pub fn is_crawlable(&self) -> bool {
        matches!(self, Self::Product | Self::Category)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "product" => Some(Self::Product),
            "category" => Some(Self::Category),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
