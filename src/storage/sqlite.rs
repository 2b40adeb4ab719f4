//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::product::ProductFields;
use crate::state::{SitemapStatus, UrlStatus, UrlType};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{
    timestamp_now, ProductRecord, QueueItem, SiteStats, SitemapRecord, SkuIndexEntry, UrlOutcome,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const SITEMAP_COLUMNS: &str =
    "site, url, status, discovered_from, item_count, attempts, last_error, updated_at";

const QUEUE_COLUMNS: &str = "site, url, url_type, status, depth, discovered_from, attempts, \
     last_http_status, blocked, last_error, updated_at";

const SKU_COLUMNS: &str = "site, sku, url, title, category_path, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // WAL lets exports and matching read while a crawl writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(30))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn status_counts(&self, table: &str, site: &str) -> StorageResult<BTreeMap<String, u64>> {
        let sql = format!(
            "SELECT status, COUNT(*) FROM {} WHERE site = ?1 GROUP BY status",
            table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let counts = stmt
            .query_map(params![site], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }

    fn count(&self, sql: &str, site: &str) -> StorageResult<u64> {
        let n: i64 = self.conn.query_row(sql, params![site], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn sitemap_from_row(row: &Row<'_>) -> rusqlite::Result<SitemapRecord> {
    Ok(SitemapRecord {
        site: row.get(0)?,
        url: row.get(1)?,
        status: SitemapStatus::from_db_string(&row.get::<_, String>(2)?)
            .unwrap_or(SitemapStatus::Error),
        discovered_from: row.get(3)?,
        item_count: row.get::<_, Option<i64>>(4)?.map(|n| n as u64),
        attempts: row.get(5)?,
        last_error: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn queue_item_from_row(row: &Row<'_>) -> rusqlite::Result<QueueItem> {
    Ok(QueueItem {
        site: row.get(0)?,
        url: row.get(1)?,
        url_type: UrlType::from_db_string(&row.get::<_, String>(2)?).unwrap_or(UrlType::Other),
        status: UrlStatus::from_db_string(&row.get::<_, String>(3)?).unwrap_or(UrlStatus::Error),
        depth: row.get(4)?,
        discovered_from: row.get(5)?,
        attempts: row.get(6)?,
        last_http_status: row.get(7)?,
        blocked: row.get(8)?,
        last_error: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn sku_entry_from_row(row: &Row<'_>) -> rusqlite::Result<SkuIndexEntry> {
    Ok(SkuIndexEntry {
        site: row.get(0)?,
        sku: row.get(1)?,
        url: row.get(2)?,
        title: row.get(3)?,
        category_path: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Sitemaps =====

    fn enqueue_sitemap(
        &mut self,
        site: &str,
        url: &str,
        discovered_from: Option<&str>,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO sitemaps (site, url, status, discovered_from, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(site, url) DO NOTHING",
            params![
                site,
                url,
                SitemapStatus::Pending.to_db_string(),
                discovered_from,
                timestamp_now()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn next_pending_sitemap(&self, site: &str) -> StorageResult<Option<String>> {
        let url = self
            .conn
            .query_row(
                "SELECT url FROM sitemaps
                 WHERE site = ?1 AND status = ?2
                 ORDER BY attempts ASC, updated_at ASC, rowid ASC
                 LIMIT 1",
                params![site, SitemapStatus::Pending.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(url)
    }

    fn set_sitemap_status(
        &mut self,
        site: &str,
        url: &str,
        status: SitemapStatus,
        item_count: Option<u64>,
        error: Option<&str>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE sitemaps
             SET status = ?1,
                 item_count = COALESCE(?2, item_count),
                 attempts = attempts + 1,
                 last_error = ?3,
                 updated_at = ?4
             WHERE site = ?5 AND url = ?6",
            params![
                status.to_db_string(),
                item_count.map(|n| n as i64),
                error,
                timestamp_now(),
                site,
                url
            ],
        )?;
        Ok(())
    }

    fn get_sitemap(&self, site: &str, url: &str) -> StorageResult<Option<SitemapRecord>> {
        let sql = format!(
            "SELECT {} FROM sitemaps WHERE site = ?1 AND url = ?2",
            SITEMAP_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![site, url], sitemap_from_row)
            .optional()?;
        Ok(record)
    }

    // ===== URL queue =====

    fn enqueue_url(
        &mut self,
        site: &str,
        url: &str,
        url_type: UrlType,
        depth: u32,
        discovered_from: Option<&str>,
    ) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO url_queue (site, url, url_type, status, depth, discovered_from, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(site, url) DO NOTHING",
            params![
                site,
                url,
                url_type.to_db_string(),
                UrlStatus::Pending.to_db_string(),
                depth,
                discovered_from,
                timestamp_now()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn next_pending_url(
        &self,
        site: &str,
        allowed_types: &[UrlType],
        max_depth: u32,
    ) -> StorageResult<Option<QueueItem>> {
        if allowed_types.is_empty() {
            return Ok(None);
        }

        let type_placeholders = (0..allowed_types.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM url_queue
             WHERE site = ?1 AND status = ?2 AND depth <= ?{} AND url_type IN ({})
             ORDER BY depth ASC, attempts ASC, updated_at ASC, rowid ASC
             LIMIT 1",
            QUEUE_COLUMNS,
            allowed_types.len() + 3,
            type_placeholders
        );

        let mut values = vec![
            Value::Text(site.to_string()),
            Value::Text(UrlStatus::Pending.to_db_string().to_string()),
        ];
        values.extend(
            allowed_types
                .iter()
                .map(|t| Value::Text(t.to_db_string().to_string())),
        );
        values.push(Value::Integer(i64::from(max_depth)));

        let item = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), queue_item_from_row)
            .optional()?;
        Ok(item)
    }

    fn set_url_status(
        &mut self,
        site: &str,
        url: &str,
        outcome: &UrlOutcome,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE url_queue
             SET status = ?1,
                 attempts = attempts + 1,
                 last_http_status = COALESCE(?2, last_http_status),
                 blocked = ?3,
                 last_error = ?4,
                 updated_at = ?5
             WHERE site = ?6 AND url = ?7",
            params![
                outcome.status.to_db_string(),
                outcome.http_status,
                outcome.blocked,
                outcome.error,
                timestamp_now(),
                site,
                url
            ],
        )?;
        Ok(())
    }

    fn get_url(&self, site: &str, url: &str) -> StorageResult<Option<QueueItem>> {
        let sql = format!(
            "SELECT {} FROM url_queue WHERE site = ?1 AND url = ?2",
            QUEUE_COLUMNS
        );
        let item = self
            .conn
            .query_row(&sql, params![site, url], queue_item_from_row)
            .optional()?;
        Ok(item)
    }

    fn reset_errors(&mut self, site: &str) -> StorageResult<u64> {
        let reset = self.conn.execute(
            "UPDATE url_queue
             SET status = ?1, last_error = NULL, blocked = 0, updated_at = ?2
             WHERE site = ?3 AND status IN (?4, ?5)",
            params![
                UrlStatus::Pending.to_db_string(),
                timestamp_now(),
                site,
                UrlStatus::Error.to_db_string(),
                UrlStatus::Blocked.to_db_string()
            ],
        )?;
        Ok(reset as u64)
    }

    fn failed_urls(&self) -> StorageResult<Vec<QueueItem>> {
        let sql = format!(
            "SELECT {} FROM url_queue
             WHERE status IN (?1, ?2)
             ORDER BY updated_at DESC, rowid DESC",
            QUEUE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![
                    UrlStatus::Error.to_db_string(),
                    UrlStatus::Blocked.to_db_string()
                ],
                queue_item_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // ===== Products =====

    fn upsert_product(
        &mut self,
        site: &str,
        url: &str,
        fields: &ProductFields,
        payload: &serde_json::Value,
    ) -> StorageResult<()> {
        let now = timestamp_now();
        let payload_json = serde_json::to_string(payload)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO products (site, url, sku, title, category_path, payload_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(site, url) DO UPDATE SET
                 sku = excluded.sku,
                 title = excluded.title,
                 category_path = excluded.category_path,
                 payload_json = excluded.payload_json,
                 updated_at = excluded.updated_at",
            params![
                site,
                url,
                fields.sku,
                fields.title,
                fields.category_path,
                payload_json,
                now
            ],
        )?;

        if let Some(sku) = fields.sku.as_deref().filter(|s| !s.is_empty()) {
            tx.execute(
                "INSERT INTO sku_index (site, sku, url, title, category_path, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(site, sku, url) DO UPDATE SET
                     title = excluded.title,
                     category_path = excluded.category_path,
                     updated_at = excluded.updated_at",
                params![site, sku, url, fields.title, fields.category_path, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_product(&self, site: &str, url: &str) -> StorageResult<Option<ProductRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT site, url, sku, title, category_path, payload_json, updated_at
                 FROM products WHERE site = ?1 AND url = ?2",
                params![site, url],
                |row| {
                    Ok(ProductRecord {
                        site: row.get(0)?,
                        url: row.get(1)?,
                        sku: row.get(2)?,
                        title: row.get(3)?,
                        category_path: row.get(4)?,
                        payload: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn lookup_sku(&self, sku: &str) -> StorageResult<Vec<SkuIndexEntry>> {
        let sql = format!(
            "SELECT {} FROM sku_index WHERE sku = ?1 ORDER BY updated_at DESC, rowid DESC",
            SKU_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![sku], sku_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn sku_entries(&self) -> StorageResult<Vec<SkuIndexEntry>> {
        let sql = format!(
            "SELECT {} FROM sku_index ORDER BY site, sku, updated_at DESC",
            SKU_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], sku_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ===== Statistics =====

    fn site_stats(&self, site: &str) -> StorageResult<SiteStats> {
        Ok(SiteStats {
            sitemaps: self.status_counts("sitemaps", site)?,
            url_queue: self.status_counts("url_queue", site)?,
            products_with_sku: self.count(
                "SELECT COUNT(*) FROM products WHERE site = ?1 AND sku IS NOT NULL AND sku != ''",
                site,
            )?,
            distinct_skus: self.count(
                "SELECT COUNT(DISTINCT sku) FROM sku_index WHERE site = ?1",
                site,
            )?,
        })
    }
}
