//! Crawler module for sitemap expansion and page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and cookie support
//! - Sitemap and robots.txt parsing
//! - Link extraction and anti-bot page detection
//! - Overall crawl coordination over the persisted frontier

mod block;
mod cookies;
mod coordinator;
mod fetcher;
mod links;
mod sitemap;

pub use block::{detect_block_page, BLOCK_MARKERS, BLOCK_MARKER_THRESHOLD, DECISIVE_MARKER};
pub use cookies::{load_cookie_jar, parse_netscape_cookies, NetscapeCookie};
pub use coordinator::{Coordinator, FrontierKind, SiteReport};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpClient};
pub use links::extract_links;
pub use sitemap::{
    decode_sitemap_bytes, is_nested_sitemap, is_robots_url, parse_sitemap_locs,
    sitemaps_from_robots, SitemapError,
};

use crate::config::{Config, SiteConfig};
use crate::output::{export_crawl, CrawlSummary};
use crate::storage::{open_storage, SiteStats, Storage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Fixed seed for the fetch jitter so runs are reproducible
pub const JITTER_SEED: u64 = 42;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open (or create) the index database
/// 2. Build the HTTP client
/// 3. Crawl each selected site in order
/// 4. Export the SKU index and failed URLs
/// 5. Write `crawl_summary.json` and return the summary
///
/// # Arguments
///
/// * `config` - The validated indexer configuration
/// * `sites` - Compiled profiles of the sites to crawl
/// * `selector` - The site selector as given by the user ("both" or a key)
pub async fn run_crawl(
    config: &Config,
    sites: &[SiteConfig],
    selector: &str,
) -> crate::Result<CrawlSummary> {
    let storage = open_storage(Path::new(&config.output.db_path))?;
    let client = build_http_client(&config.http)?;
    let rng = StdRng::seed_from_u64(JITTER_SEED);

    let mut coordinator = Coordinator::new(storage, client, config.crawl.clone(), rng);
    for site in sites {
        coordinator.crawl_site(site).await?;
    }

    let storage = coordinator.into_storage();
    let mut stats: BTreeMap<String, SiteStats> = BTreeMap::new();
    for site in sites {
        stats.insert(site.key.clone(), storage.site_stats(&site.key)?);
    }

    let summary = export_crawl(&storage, &config.output, selector, stats)?;
    info!("exported: {}", serde_json::to_string(&summary.exports)?);
    Ok(summary)
}
