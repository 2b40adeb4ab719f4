use serde::Deserialize;

/// Desktop Chrome user agent sent with every request unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Main configuration structure for the indexer
///
/// Every table is optional in the TOML file; missing values fall back to the
/// defaults below and command-line flags override whatever was loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Extra or overriding site profiles, keyed by `key`
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum link-discovery depth from sitemap and seed URLs
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Page budget per site (None = unbounded)
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u64>,

    /// Sitemap budget per site (None = unbounded)
    #[serde(rename = "max-sitemaps")]
    pub max_sitemaps: Option<u64>,

    /// Lower bound of the pause between fetches (seconds)
    #[serde(rename = "delay-min")]
    pub delay_min: f64,

    /// Upper bound of the pause between fetches (seconds)
    #[serde(rename = "delay-max")]
    pub delay_max: f64,

    /// Follow links found on fetched pages
    #[serde(rename = "discover-links")]
    pub discover_links: bool,

    /// Move error/blocked URLs back to pending before crawling
    #[serde(rename = "retry-errors")]
    pub retry_errors: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: None,
            max_sitemaps: None,
            delay_min: 0.7,
            delay_max: 1.8,
            discover_links: true,
            retry_errors: false,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout (seconds)
    pub timeout: f64,

    /// Total attempts for network-level failures
    pub retries: u32,

    /// Linear backoff unit (seconds); attempt N waits N times this value
    #[serde(rename = "retry-backoff")]
    pub retry_backoff: f64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Raw `Cookie` header sent with every request
    #[serde(rename = "cookie-header")]
    pub cookie_header: Option<String>,

    /// Netscape-format cookies.txt file
    #[serde(rename = "cookie-file")]
    pub cookie_file: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: 35.0,
            retries: 3,
            retry_backoff: 1.2,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_header: None,
            cookie_file: None,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "db-path")]
    pub db_path: String,

    /// Path to the append-only log file
    #[serde(rename = "log-path")]
    pub log_path: String,

    /// Directory for crawl exports
    #[serde(rename = "export-dir")]
    pub export_dir: String,

    /// Directory for match reports
    #[serde(rename = "match-dir")]
    pub match_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            db_path: "outputs/site_index/twinset_index.db".to_string(),
            log_path: "outputs/site_index/twinset_index.log".to_string(),
            export_dir: "outputs/site_index/exports".to_string(),
            match_dir: "outputs/site_index/match".to_string(),
        }
    }
}

/// Site profile as written in the configuration file
///
/// Patterns are regular expressions matched against normalized URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Site key used in the database (e.g., "twinset.ru")
    pub key: String,

    /// URL prefix that links must share to count as same-site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// robots.txt and sitemap URLs to start discovery from
    #[serde(default, rename = "sitemap-candidates")]
    pub sitemap_candidates: Vec<String>,

    /// Category pages enqueued at depth 0 before the page phase
    #[serde(default, rename = "seed-category-urls")]
    pub seed_category_urls: Vec<String>,

    #[serde(rename = "product-pattern")]
    pub product_pattern: String,

    #[serde(rename = "category-pattern")]
    pub category_pattern: String,

    /// URLs matching this are classified `other` outright
    #[serde(default, rename = "stale-pattern")]
    pub stale_pattern: Option<String>,

    /// Product parser variant ("twinset-ru" or "twinset-com")
    pub parser: String,

    /// Drop a trailing slash from non-root paths during normalization
    #[serde(default, rename = "trim-trailing-slash")]
    pub trim_trailing_slash: bool,
}

impl SiteEntry {
    /// Built-in profile for twinset.ru
    pub fn twinset_ru() -> Self {
        Self {
            key: "twinset.ru".to_string(),
            base_url: "https://twinset.ru".to_string(),
            sitemap_candidates: vec![
                "https://twinset.ru/sitemap.xml".to_string(),
                "https://twinset.ru/robots.txt".to_string(),
            ],
            seed_category_urls: vec!["https://twinset.ru/catalog/".to_string()],
            product_pattern: r"(?i)^https://twinset\.ru/catalog/.+/\d+/?$".to_string(),
            category_pattern: r"(?i)^https://twinset\.ru/catalog(?:/.*)?/?$".to_string(),
            // Bitrix lists long-dead numeric catalog paths in its sitemap
            stale_pattern: Some(r"(?i)^https://twinset\.ru/catalog/\d+/?$".to_string()),
            parser: "twinset-ru".to_string(),
            trim_trailing_slash: false,
        }
    }

    /// Built-in profile for twinset.com
    pub fn twinset_com() -> Self {
        Self {
            key: "twinset.com".to_string(),
            base_url: "https://www.twinset.com".to_string(),
            sitemap_candidates: vec![
                "https://www.twinset.com/sitemap_index.xml".to_string(),
                "https://www.twinset.com/robots.txt".to_string(),
            ],
            seed_category_urls: vec!["https://www.twinset.com/row/".to_string()],
            product_pattern:
                r"(?i)^https://www\.twinset\.com/(?:row|[a-z]{2}(?:-[a-z]{2})?)/.+\.html$"
                    .to_string(),
            category_pattern: r"(?i)^https://www\.twinset\.com/(?:row|[a-z]{2}(?:-[a-z]{2})?)/(?:|women.*|man.*|child.*|sale.*|new.*|collection.*)$"
                .to_string(),
            stale_pattern: None,
            parser: "twinset-com".to_string(),
            trim_trailing_slash: true,
        }
    }

    /// All built-in profiles, in crawl order
    pub fn builtin() -> Vec<Self> {
        vec![Self::twinset_ru(), Self::twinset_com()]
    }
}
