//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::product::ProductFields;
use crate::state::{SitemapStatus, UrlType};
use crate::storage::{ProductRecord, QueueItem, SiteStats, SitemapRecord, SkuIndexEntry, UrlOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every mutating call is committed before it returns, so a process killed
/// between calls loses nothing it already reported.
pub trait Storage {
    // ===== Sitemaps =====

    /// Records a sitemap URL as pending
    ///
    /// Returns false (and changes nothing) if the sitemap is already known.
    fn enqueue_sitemap(
        &mut self,
        site: &str,
        url: &str,
        discovered_from: Option<&str>,
    ) -> StorageResult<bool>;

    /// Next pending sitemap, fewest attempts first, then oldest
    fn next_pending_sitemap(&self, site: &str) -> StorageResult<Option<String>>;

    /// Records the outcome of one sitemap attempt
    ///
    /// Always increments `attempts`; `item_count` keeps its previous value
    /// when None.
    fn set_sitemap_status(
        &mut self,
        site: &str,
        url: &str,
        status: SitemapStatus,
        item_count: Option<u64>,
        error: Option<&str>,
    ) -> StorageResult<()>;

    fn get_sitemap(&self, site: &str, url: &str) -> StorageResult<Option<SitemapRecord>>;

    // ===== URL queue =====

    /// Adds a URL to the queue as pending
    ///
    /// Returns false (and changes nothing) if the URL is already queued,
    /// whatever its status.
    fn enqueue_url(
        &mut self,
        site: &str,
        url: &str,
        url_type: UrlType,
        depth: u32,
        discovered_from: Option<&str>,
    ) -> StorageResult<bool>;

    /// Next pending URL of an allowed type within the depth bound
    ///
    /// Ordered by depth, then attempts, then updated_at, then insertion order.
    fn next_pending_url(
        &self,
        site: &str,
        allowed_types: &[UrlType],
        max_depth: u32,
    ) -> StorageResult<Option<QueueItem>>;

    /// Records the outcome of one fetch
    ///
    /// Always increments `attempts`; `last_http_status` keeps its previous
    /// value when the outcome carries none.
    fn set_url_status(&mut self, site: &str, url: &str, outcome: &UrlOutcome)
        -> StorageResult<()>;

    fn get_url(&self, site: &str, url: &str) -> StorageResult<Option<QueueItem>>;

    /// Moves every error/blocked URL of a site back to pending
    ///
    /// Clears the blocked flag and error text. Returns the number of rows reset.
    fn reset_errors(&mut self, site: &str) -> StorageResult<u64>;

    /// URLs in error or blocked state across all sites, newest first
    fn failed_urls(&self) -> StorageResult<Vec<QueueItem>>;

    // ===== Products =====

    /// Inserts or replaces the product row and, when a SKU is present,
    /// the matching SKU index row, atomically
    fn upsert_product(
        &mut self,
        site: &str,
        url: &str,
        fields: &ProductFields,
        payload: &serde_json::Value,
    ) -> StorageResult<()>;

    fn get_product(&self, site: &str, url: &str) -> StorageResult<Option<ProductRecord>>;

    /// SKU index rows for an exact SKU across all sites, newest first
    fn lookup_sku(&self, sku: &str) -> StorageResult<Vec<SkuIndexEntry>>;

    /// The whole SKU index ordered by site, SKU, then newest first
    fn sku_entries(&self) -> StorageResult<Vec<SkuIndexEntry>>;

    // ===== Statistics =====

    fn site_stats(&self, site: &str) -> StorageResult<SiteStats>;
}
