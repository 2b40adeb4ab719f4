//! Database schema definitions
//!
//! Column names match databases produced by earlier indexer runs, so an
//! existing index file can be resumed as-is.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Sitemaps discovered from robots.txt, candidates and sitemap indexes
CREATE TABLE IF NOT EXISTS sitemaps (
    site TEXT NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    discovered_from TEXT,
    item_count INTEGER,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site, url)
);

-- Persistent crawl frontier for product and category pages
CREATE TABLE IF NOT EXISTS url_queue (
    site TEXT NOT NULL,
    url TEXT NOT NULL,
    url_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    depth INTEGER NOT NULL DEFAULT 0,
    discovered_from TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_http_status INTEGER,
    blocked INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site, url)
);

CREATE INDEX IF NOT EXISTS idx_url_queue_pending
    ON url_queue(site, status, depth, attempts, updated_at);

-- Latest extraction result per product URL
CREATE TABLE IF NOT EXISTS products (
    site TEXT NOT NULL,
    url TEXT NOT NULL,
    sku TEXT,
    title TEXT,
    category_path TEXT,
    payload_json TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site, url)
);

-- SKU lookup table; one row per (site, sku, url)
CREATE TABLE IF NOT EXISTS sku_index (
    site TEXT NOT NULL,
    sku TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT,
    category_path TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site, sku, url)
);

CREATE INDEX IF NOT EXISTS idx_sku_index_sku ON sku_index(sku);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
