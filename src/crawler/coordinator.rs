//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop for one site:
//! - Seeding sitemaps from the site's candidates (robots.txt or direct)
//! - Draining the sitemap frontier into the URL queue
//! - Seeding category pages and draining the URL queue
//! - Block detection, product extraction and link discovery per page
//!
//! Both phases run through the same drain loop over the persisted frontier,
//! so an interrupted crawl resumes from whatever is still pending.

use crate::config::{CrawlConfig, SiteConfig};
use crate::crawler::block::detect_block_page;
use crate::crawler::fetcher::{FetchError, FetchedPage, HttpClient};
use crate::crawler::links::extract_links;
use crate::crawler::sitemap::{
    is_nested_sitemap, is_robots_url, parse_sitemap_locs, sitemaps_from_robots,
};
use crate::product::text::safe_error;
use crate::state::{SitemapStatus, UrlType};
use crate::storage::{QueueItem, SiteStats, Storage, UrlOutcome};
use crate::UrlError;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// URL types the page phase dequeues
const CRAWLABLE_TYPES: &[UrlType] = &[UrlType::Product, UrlType::Category];

/// Discovered-from marker for configured seed categories
const SEED_MARKER: &str = "seed";

/// Which half of the persisted frontier a drain works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierKind {
    Sitemaps,
    Pages,
}

impl FrontierKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Sitemaps => "sitemaps",
            Self::Pages => "pages",
        }
    }
}

enum FrontierItem {
    Sitemap(String),
    Page(QueueItem),
}

/// Outcome of crawling one site
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub site: String,
    pub reset_errors: u64,
    pub sitemaps_processed: u64,
    pub pages_processed: u64,
    pub stats: SiteStats,
}

/// Main crawler coordinator structure
///
/// Generic over storage and the jitter RNG so tests can supply a seeded RNG.
pub struct Coordinator<S: Storage, R: Rng> {
    storage: S,
    client: HttpClient,
    options: CrawlConfig,
    rng: R,
}

impl<S: Storage, R: Rng> Coordinator<S, R> {
    /// Creates a new coordinator instance
    pub fn new(storage: S, client: HttpClient, options: CrawlConfig, rng: R) -> Self {
        Self {
            storage,
            client,
            options,
            rng,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Runs both crawl phases for one site
    ///
    /// Only storage failures abort; fetch and parse faults are recorded on
    /// the affected item and the loop moves on.
    pub async fn crawl_site(&mut self, site: &SiteConfig) -> crate::Result<SiteReport> {
        info!("=== START {} ===", site.key);

        let reset_errors = if self.options.retry_errors {
            let reset = self.storage.reset_errors(&site.key)?;
            info!("{} reset error/blocked -> pending: {}", site.key, reset);
            reset
        } else {
            0
        };

        self.seed_sitemaps(site).await?;
        let sitemaps_processed = self.drain(site, FrontierKind::Sitemaps).await?;
        info!("{} sitemaps processed: {}", site.key, sitemaps_processed);

        self.seed_categories(site)?;
        let pages_processed = self.drain(site, FrontierKind::Pages).await?;
        info!("{} pages processed: {}", site.key, pages_processed);

        let stats = self.storage.site_stats(&site.key)?;
        info!("{} stats: {}", site.key, serde_json::to_string(&stats)?);

        Ok(SiteReport {
            site: site.key.clone(),
            reset_errors,
            sitemaps_processed,
            pages_processed,
            stats,
        })
    }

    /// Enqueues the site's sitemap candidates
    ///
    /// robots.txt candidates are fetched and expanded into their `Sitemap:`
    /// entries; a failed robots fetch is logged and skipped.
    async fn seed_sitemaps(&mut self, site: &SiteConfig) -> crate::Result<()> {
        for candidate in &site.sitemap_candidates {
            if !is_robots_url(candidate) {
                match site.normalize(candidate) {
                    Ok(clean) => {
                        self.storage.enqueue_sitemap(&site.key, &clean, None)?;
                    }
                    Err(e) => warn!("{} bad sitemap candidate {}: {}", site.key, candidate, e),
                }
                continue;
            }

            let robots = match self.client.get(candidate).await {
                Ok(page) => page.text(),
                Err(e) => {
                    warn!("{} robots read failed: {}", site.key, safe_error(&e.to_string()));
                    continue;
                }
            };

            for sitemap_url in sitemaps_from_robots(&robots) {
                if let Ok(clean) = site.normalize(&sitemap_url) {
                    self.storage
                        .enqueue_sitemap(&site.key, &clean, Some(candidate))?;
                }
            }
        }
        Ok(())
    }

    /// Enqueues the site's seed category pages at depth 0
    fn seed_categories(&mut self, site: &SiteConfig) -> crate::Result<()> {
        for seed in &site.seed_category_urls {
            match site.normalize(seed) {
                Ok(clean) => {
                    self.storage.enqueue_url(
                        &site.key,
                        &clean,
                        UrlType::Category,
                        0,
                        Some(SEED_MARKER),
                    )?;
                }
                Err(e) => warn!("{} bad seed URL {}: {}", site.key, seed, e),
            }
        }
        Ok(())
    }

    /// Processes pending items of one kind until none remain or the budget
    /// is spent; returns the number processed
    pub async fn drain(&mut self, site: &SiteConfig, kind: FrontierKind) -> crate::Result<u64> {
        let budget = match kind {
            FrontierKind::Sitemaps => self.options.max_sitemaps,
            FrontierKind::Pages => self.options.max_pages,
        };
        let mut processed = 0u64;

        loop {
            if budget.is_some_and(|max| processed >= max) {
                info!("{} {} budget reached ({})", site.key, kind.label(), processed);
                break;
            }

            let Some(item) = self.next_item(site, kind)? else {
                debug!("{} no pending {}", site.key, kind.label());
                break;
            };

            match item {
                FrontierItem::Sitemap(url) => self.process_sitemap(site, &url).await?,
                FrontierItem::Page(item) => self.process_page(site, &item).await?,
            }
            processed += 1;

            self.pause().await;
        }

        Ok(processed)
    }

    fn next_item(
        &self,
        site: &SiteConfig,
        kind: FrontierKind,
    ) -> crate::Result<Option<FrontierItem>> {
        let item = match kind {
            FrontierKind::Sitemaps => self
                .storage
                .next_pending_sitemap(&site.key)?
                .map(FrontierItem::Sitemap),
            FrontierKind::Pages => self
                .storage
                .next_pending_url(&site.key, CRAWLABLE_TYPES, self.options.max_depth)?
                .map(FrontierItem::Page),
        };
        Ok(item)
    }

    /// Fetches one sitemap and enqueues what it lists
    ///
    /// Nested sitemaps go back to the sitemap frontier; product and category
    /// URLs enter the URL queue at depth 0.
    async fn process_sitemap(&mut self, site: &SiteConfig, url: &str) -> crate::Result<()> {
        let locs = match self.fetch_sitemap_locs(url).await {
            Ok(locs) => locs,
            Err(e) => {
                let message = safe_error(&e.to_string());
                warn!("{} sitemap error: {} :: {}", site.key, url, message);
                self.storage.set_sitemap_status(
                    &site.key,
                    url,
                    SitemapStatus::Error,
                    None,
                    Some(&message),
                )?;
                return Ok(());
            }
        };

        let mut nested = 0usize;
        let mut queued = 0usize;
        for loc in &locs {
            let Ok(clean) = site.normalize(loc) else {
                continue;
            };

            if is_nested_sitemap(&clean) {
                self.storage.enqueue_sitemap(&site.key, &clean, Some(url))?;
                nested += 1;
                continue;
            }

            let url_type = site.classify(&clean);
            if url_type.is_crawlable() {
                self.storage
                    .enqueue_url(&site.key, &clean, url_type, 0, Some(url))?;
                queued += 1;
            }
        }

        self.storage.set_sitemap_status(
            &site.key,
            url,
            SitemapStatus::Done,
            Some(locs.len() as u64),
            None,
        )?;
        info!(
            "{} sitemap done: {} (locs={}, nested={}, queued={})",
            site.key,
            url,
            locs.len(),
            nested,
            queued
        );
        Ok(())
    }

    async fn fetch_sitemap_locs(&self, url: &str) -> crate::Result<Vec<String>> {
        let page = self.client.get(url).await?;
        Ok(parse_sitemap_locs(&page.body)?)
    }

    /// Processes a single queued page
    ///
    /// This method:
    /// 1. Fetches the page and records gone/error outcomes
    /// 2. Stops at anti-bot pages without extracting anything
    /// 3. Extracts and upserts product fields for product URLs
    /// 4. Enqueues same-site product/category links one level deeper
    /// 5. Marks the item done
    async fn process_page(&mut self, site: &SiteConfig, item: &QueueItem) -> crate::Result<()> {
        let page = match self.client.get(&item.url).await {
            Ok(page) => page,
            Err(e) => {
                self.record_fetch_failure(site, item, &e)?;
                return Ok(());
            }
        };

        let html = page.text();
        if detect_block_page(&html) {
            self.storage
                .set_url_status(&site.key, &item.url, &UrlOutcome::blocked(page.status))?;
            warn!("{} blocked: {}", site.key, item.url);
            return Ok(());
        }

        let mut found_sku = None;
        if item.url_type == UrlType::Product {
            let fields = site.parser.parse(&html, &item.url);
            let payload = json!({
                "headers": page.headers,
                "url_type": item.url_type.to_db_string(),
            });
            self.storage
                .upsert_product(&site.key, &item.url, &fields, &payload)?;
            found_sku = fields.sku;
        }

        if self.options.discover_links && item.depth < self.options.max_depth {
            self.handle_discovered_links(site, item, &page, &html)?;
        }

        self.storage
            .set_url_status(&site.key, &item.url, &UrlOutcome::done(page.status))?;

        match found_sku {
            Some(sku) => info!("{} product ok: sku={} url={}", site.key, sku, item.url),
            None => info!(
                "{} page ok: type={} depth={} url={}",
                site.key, item.url_type, item.depth, item.url
            ),
        }
        Ok(())
    }

    /// Records a failed fetch; terminal outcomes log at info, resumable
    /// ones at warn
    fn record_fetch_failure(
        &mut self,
        site: &SiteConfig,
        item: &QueueItem,
        error: &FetchError,
    ) -> crate::Result<()> {
        let outcome = match error {
            FetchError::Gone { status, .. } => UrlOutcome::gone(*status),
            FetchError::Http { status, .. } => {
                UrlOutcome::error(Some(*status), &error.to_string())
            }
            FetchError::Transient { .. } => UrlOutcome::error(None, &error.to_string()),
        };

        let reason = outcome.error.as_deref().unwrap_or_default();
        if outcome.status.is_terminal() {
            info!("{} {}: {} :: {}", site.key, outcome.status, item.url, reason);
        } else if outcome.status.is_resumable() {
            warn!("{} page {}: {} :: {}", site.key, outcome.status, item.url, reason);
        }

        self.storage.set_url_status(&site.key, &item.url, &outcome)?;
        Ok(())
    }

    /// Handles discovered links from a page
    ///
    /// Links are resolved against the final (post-redirect) URL, normalized
    /// under the site's rules, restricted to the site's base URL, and
    /// classified. Returns the number of newly queued URLs.
    fn handle_discovered_links(
        &mut self,
        site: &SiteConfig,
        item: &QueueItem,
        page: &FetchedPage,
        html: &str,
    ) -> crate::Result<usize> {
        let base = Url::parse(&page.url)
            .or_else(|_| Url::parse(&item.url))
            .map_err(|e| UrlError::Parse(e.to_string()))?;

        let mut queued = 0usize;
        for link in extract_links(html, &base) {
            let Ok(clean) = site.normalize(&link) else {
                continue;
            };
            if !site.is_same_site(&clean) {
                continue;
            }

            let link_type = site.classify(&clean);
            if !link_type.is_crawlable() {
                continue;
            }

            if self.storage.enqueue_url(
                &site.key,
                &clean,
                link_type,
                item.depth + 1,
                Some(&item.url),
            )? {
                queued += 1;
            }
        }

        debug!("{} discovered {} new URLs on {}", site.key, queued, item.url);
        Ok(queued)
    }

    /// Sleeps for a uniformly random delay between fetches
    async fn pause(&mut self) {
        let delay = jitter(
            &mut self.rng,
            self.options.delay_min,
            self.options.delay_max,
        );
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Uniform delay in `[min, max]` seconds; None when `max` is not positive
pub(crate) fn jitter<R: Rng>(rng: &mut R, min: f64, max: f64) -> Option<Duration> {
    if max <= 0.0 {
        return None;
    }
    let secs = rng.gen_range(min.min(max)..=max);
    Some(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_jitter_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let delay = jitter(&mut rng, 0.7, 1.8).unwrap();
            assert!(delay >= Duration::from_secs_f64(0.7));
            assert!(delay <= Duration::from_secs_f64(1.8));
        }
    }

    #[test]
    fn test_jitter_disabled_when_max_is_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jitter(&mut rng, 0.0, 0.0), None);
    }

    #[test]
    fn test_jitter_fixed_delay() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jitter(&mut rng, 1.5, 1.5), Some(Duration::from_secs_f64(1.5)));
    }

    #[test]
    fn test_jitter_deterministic_for_seed() {
        let mut first = StdRng::seed_from_u64(7);
        let mut second = StdRng::seed_from_u64(7);
        let a: Vec<_> = (0..10).map(|_| jitter(&mut first, 0.7, 1.8)).collect();
        let b: Vec<_> = (0..10).map(|_| jitter(&mut second, 0.7, 1.8)).collect();
        assert_eq!(a, b);
    }
}
