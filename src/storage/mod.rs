//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the indexer, including:
//! - SQLite database initialization and schema management
//! - Sitemap and URL queue state persistence
//! - Product and SKU index upserts
//! - Read-side queries for exports, matching and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::product::text::safe_error;
use crate::state::{SitemapStatus, UrlStatus, UrlType};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Opens (creating if needed) the index database at `path`
///
/// Missing parent directories are created.
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteStorage::new(path)
}

/// Current UTC time as stored in every `updated_at` column
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Represents a sitemap in the database
#[derive(Debug, Clone)]
pub struct SitemapRecord {
    pub site: String,
    pub url: String,
    pub status: SitemapStatus,
    pub discovered_from: Option<String>,
    pub item_count: Option<u64>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub updated_at: String,
}

/// Represents a URL in the crawl queue
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub site: String,
    pub url: String,
    pub url_type: UrlType,
    pub status: UrlStatus,
    pub depth: u32,
    pub discovered_from: Option<String>,
    pub attempts: u32,
    pub last_http_status: Option<u16>,
    pub blocked: bool,
    pub last_error: Option<String>,
    pub updated_at: String,
}

/// Represents the latest extraction for a product URL
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub site: String,
    pub url: String,
    pub sku: Option<String>,
    pub title: Option<String>,
    pub category_path: Option<String>,
    pub payload: Option<String>,
    pub updated_at: String,
}

/// Represents one row of the SKU index
#[derive(Debug, Clone, Serialize)]
pub struct SkuIndexEntry {
    pub site: String,
    pub sku: String,
    pub url: String,
    pub title: Option<String>,
    pub category_path: Option<String>,
    pub updated_at: String,
}

/// Per-site counters reported after a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    /// Sitemap count per status
    pub sitemaps: BTreeMap<String, u64>,
    /// Queue count per status
    pub url_queue: BTreeMap<String, u64>,
    pub products_with_sku: u64,
    pub distinct_skus: u64,
}

/// Result of processing one queued URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    pub status: UrlStatus,
    pub http_status: Option<u16>,
    pub blocked: bool,
    pub error: Option<String>,
}

impl UrlOutcome {
    /// Page fetched and processed
    pub fn done(http_status: u16) -> Self {
        Self {
            status: UrlStatus::Done,
            http_status: Some(http_status),
            blocked: false,
            error: None,
        }
    }

    /// Page answered 404 or 410
    pub fn gone(http_status: u16) -> Self {
        Self {
            status: UrlStatus::Gone,
            http_status: Some(http_status),
            blocked: false,
            error: Some(format!("HTTP {}", http_status)),
        }
    }

    /// Anti-bot page served with a success status
    pub fn blocked(http_status: u16) -> Self {
        Self {
            status: UrlStatus::Blocked,
            http_status: Some(http_status),
            blocked: true,
            error: Some("captcha_or_block".to_string()),
        }
    }

    /// Fetch failed; `http_status` is None for network-level failures
    pub fn error(http_status: Option<u16>, message: &str) -> Self {
        Self {
            status: UrlStatus::Error,
            http_status,
            blocked: false,
            error: Some(safe_error(message)),
        }
    }
}
