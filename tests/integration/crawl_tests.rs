//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for a storefront and run the crawl
//! loop end-to-end against an on-disk database.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use twinset_indexer::config::{CrawlConfig, HttpConfig, SiteConfig, SiteEntry};
use twinset_indexer::crawler::{build_http_client, Coordinator, FrontierKind};
use twinset_indexer::storage::{open_storage, SqliteStorage, Storage, UrlOutcome};
use twinset_indexer::{SitemapStatus, UrlStatus, UrlType};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "mock";

/// Site profile pointed at the mock server
///
/// `/catalog/<slug>/<digits>` is a product, anything else under `/catalog`
/// is a category.
fn mock_site(base_url: &str) -> SiteConfig {
    let entry = SiteEntry {
        key: SITE.to_string(),
        base_url: base_url.to_string(),
        sitemap_candidates: vec![format!("{}/sitemap.xml", base_url)],
        seed_category_urls: vec![],
        product_pattern: r"(?i)^http://127\.0\.0\.1:\d+/catalog/.+/\d+$".to_string(),
        category_pattern: r"(?i)^http://127\.0\.0\.1:\d+/catalog(?:/.*)?$".to_string(),
        stale_pattern: None,
        parser: "twinset-ru".to_string(),
        trim_trailing_slash: false,
    };
    SiteConfig::from_entry(&entry).expect("Mock site entry should compile")
}

/// Crawl options without pauses between fetches
fn crawl_options() -> CrawlConfig {
    CrawlConfig {
        delay_min: 0.0,
        delay_max: 0.0,
        ..CrawlConfig::default()
    }
}

fn http_options() -> HttpConfig {
    HttpConfig {
        timeout: 5.0,
        retries: 3,
        retry_backoff: 0.0,
        ..HttpConfig::default()
    }
}

fn test_storage(dir: &TempDir) -> SqliteStorage {
    open_storage(&dir.path().join("index.db")).expect("Failed to open test database")
}

fn coordinator(storage: SqliteStorage, options: CrawlConfig) -> Coordinator<SqliteStorage, StdRng> {
    let client = build_http_client(&http_options()).expect("Failed to build HTTP client");
    Coordinator::new(storage, client, options, StdRng::seed_from_u64(7))
}

fn urlset(urls: &[String]) -> String {
    let locs: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc></url>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        locs
    )
}

fn sitemap_index(urls: &[String]) -> String {
    let locs: String = urls
        .iter()
        .map(|u| format!("<sitemap><loc>{}</loc></sitemap>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        locs
    )
}

fn product_page(vendor: &str, title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        r#"<html><body><h1>{title}</h1>
<script>window.vueProduct = {{"name": "{title}", "selectedColorId": 1, "colors": [{{"id": 1, "title": "{title}", "offers": [{{"vendor": "{vendor}"}}]}}], "breadcrumbs": [{{"title": "Каталог"}}, {{"title": "Платья"}}]}};</script>
{anchors}
</body></html>"#
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sitemap_index_expands_to_products() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);

    let leaf_a = format!("{}/sitemap-a.xml", base);
    let leaf_b = format!("{}/sitemap-b.xml", base);
    let product_a = format!("{}/catalog/dresses/101", base);
    let product_b = format!("{}/catalog/coats/202", base);

    mount_html(&server, "/sitemap.xml", sitemap_index(&[leaf_a.clone(), leaf_b.clone()])).await;
    let about = format!("{}/about", base);
    mount_html(&server, "/sitemap-a.xml", urlset(&[product_a.clone(), about])).await;
    mount_html(&server, "/sitemap-b.xml", urlset(&[product_b.clone()])).await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage
        .enqueue_sitemap(SITE, &format!("{}/sitemap.xml", base), None)
        .unwrap();

    let mut coordinator = coordinator(storage, crawl_options());
    let processed = coordinator
        .drain(&site, FrontierKind::Sitemaps)
        .await
        .expect("Sitemap drain should succeed");
    assert_eq!(processed, 3);

    let storage = coordinator.storage();
    for (url, source) in [(&product_a, &leaf_a), (&product_b, &leaf_b)] {
        let item = storage.get_url(SITE, url).unwrap().expect("Product should be queued");
        assert_eq!(item.url_type, UrlType::Product);
        assert_eq!(item.status, UrlStatus::Pending);
        assert_eq!(item.depth, 0);
        assert_eq!(item.discovered_from.as_deref(), Some(source.as_str()));
    }

    let stats = storage.site_stats(SITE).unwrap();
    assert_eq!(stats.url_queue.get("pending"), Some(&2));
    assert_eq!(stats.sitemaps.get("done"), Some(&3));

    let leaf = storage.get_sitemap(SITE, &leaf_a).unwrap().unwrap();
    assert_eq!(leaf.item_count, Some(2));
}

#[tokio::test]
async fn test_full_crawl_indexes_products_and_discovers_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);

    let first = format!("{}/catalog/dresses/101", base);
    let second = format!("{}/catalog/dresses/102", base);
    let category = format!("{}/catalog/new/", base);

    mount_html(&server, "/sitemap.xml", urlset(&[first.clone()])).await;
    mount_html(
        &server,
        "/catalog/dresses/101",
        product_page(
            "251tp2030",
            "Платье миди",
            &[
                "/catalog/dresses/102",
                "/catalog/new/?page=2",
                "https://example.com/catalog/x/1",
                "mailto:shop@example.com",
                "/about",
            ],
        ),
    )
    .await;
    mount_html(
        &server,
        "/catalog/dresses/102",
        product_page("251tp2031", "Платье макси", &["/catalog/dresses/101"]),
    )
    .await;
    mount_html(&server, "/catalog/new/", "<html><body>Empty</body></html>".to_string()).await;

    let dir = TempDir::new().unwrap();
    let mut coordinator = coordinator(test_storage(&dir), crawl_options());
    let report = coordinator.crawl_site(&site).await.expect("Crawl should succeed");

    assert_eq!(report.sitemaps_processed, 1);
    assert_eq!(report.pages_processed, 3);
    assert_eq!(report.stats.products_with_sku, 2);
    assert_eq!(report.stats.distinct_skus, 2);
    assert_eq!(report.stats.url_queue.get("done"), Some(&3));

    let storage = coordinator.storage();

    let hits = storage.lookup_sku("251TP2030").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, first);
    assert_eq!(hits[0].title.as_deref(), Some("Платье миди"));
    assert_eq!(hits[0].category_path.as_deref(), Some("Каталог > Платья"));

    let product = storage.get_product(SITE, &first).unwrap().unwrap();
    let payload: serde_json::Value =
        serde_json::from_str(product.payload.as_deref().unwrap()).unwrap();
    assert_eq!(payload["url_type"], "product");
    assert!(payload["headers"]["content-type"].is_string());

    let discovered = storage.get_url(SITE, &second).unwrap().unwrap();
    assert_eq!(discovered.depth, 1);
    assert_eq!(discovered.discovered_from.as_deref(), Some(first.as_str()));
    assert_eq!(discovered.status, UrlStatus::Done);

    let listing = storage.get_url(SITE, &category).unwrap().unwrap();
    assert_eq!(listing.url_type, UrlType::Category);
    assert_eq!(listing.depth, 1);

    // Re-discovery from the second product must not reset the first
    let original = storage.get_url(SITE, &first).unwrap().unwrap();
    assert_eq!(original.depth, 0);
    assert_eq!(original.attempts, 1);

    assert!(storage
        .get_url(SITE, "https://example.com/catalog/x/1")
        .unwrap()
        .is_none());
    assert!(storage
        .get_url(SITE, &format!("{}/about", base))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_robots_candidate_seeds_sitemaps() {
    let server = MockServer::start().await;
    let base = server.uri();
    let robots = format!("{}/robots.txt", base);
    let listed = format!("{}/products.xml", base);

    let mut entry_site = mock_site(&base);
    entry_site.sitemap_candidates = vec![robots.clone()];

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nDisallow: /cart\nSitemap: {}\n", listed)),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/products.xml", urlset(&[])).await;

    let dir = TempDir::new().unwrap();
    let mut coordinator = coordinator(test_storage(&dir), crawl_options());
    let report = coordinator.crawl_site(&entry_site).await.unwrap();

    assert_eq!(report.sitemaps_processed, 1);
    let record = coordinator.storage().get_sitemap(SITE, &listed).unwrap().unwrap();
    assert_eq!(record.discovered_from.as_deref(), Some(robots.as_str()));
    assert_eq!(record.status, SitemapStatus::Done);
    assert_eq!(record.item_count, Some(0));
}

#[tokio::test]
async fn test_broken_sitemap_marked_error() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);

    let broken = "<urlset><url><loc>x</url></loc></urlset>".to_string();
    mount_html(&server, "/sitemap.xml", broken).await;

    let dir = TempDir::new().unwrap();
    let mut coordinator = coordinator(test_storage(&dir), crawl_options());
    coordinator.crawl_site(&site).await.unwrap();

    let record = coordinator
        .storage()
        .get_sitemap(SITE, &format!("{}/sitemap.xml", base))
        .unwrap()
        .unwrap();
    assert_eq!(record.status, SitemapStatus::Error);
    assert_eq!(record.attempts, 1);
    assert!(record.last_error.is_some());
}

#[tokio::test]
async fn test_not_found_is_gone_without_retry() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let url = format!("{}/catalog/dresses/404", base);

    Mock::given(method("GET"))
        .and(path("/catalog/dresses/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage.enqueue_url(SITE, &url, UrlType::Product, 0, None).unwrap();

    let mut coordinator = coordinator(storage, crawl_options());
    let processed = coordinator.drain(&site, FrontierKind::Pages).await.unwrap();
    assert_eq!(processed, 1);

    let item = coordinator.storage().get_url(SITE, &url).unwrap().unwrap();
    assert_eq!(item.status, UrlStatus::Gone);
    assert_eq!(item.last_http_status, Some(404));
    assert_eq!(item.attempts, 1);
    assert_eq!(item.last_error.as_deref(), Some("HTTP 404"));
}

#[tokio::test]
async fn test_server_error_recorded_and_loop_continues() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let failing = format!("{}/catalog/dresses/500", base);
    let healthy = format!("{}/catalog/dresses/200", base);

    Mock::given(method("GET"))
        .and(path("/catalog/dresses/500"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_html(&server, "/catalog/dresses/200", product_page("abc123", "Top", &[])).await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage.enqueue_url(SITE, &failing, UrlType::Product, 0, None).unwrap();
    storage.enqueue_url(SITE, &healthy, UrlType::Product, 0, None).unwrap();

    let mut coordinator = coordinator(storage, crawl_options());
    let processed = coordinator.drain(&site, FrontierKind::Pages).await.unwrap();
    assert_eq!(processed, 2);

    let storage = coordinator.storage();
    let item = storage.get_url(SITE, &failing).unwrap().unwrap();
    assert_eq!(item.status, UrlStatus::Error);
    assert_eq!(item.last_http_status, Some(503));
    assert!(item.last_error.is_some());

    assert_eq!(storage.get_url(SITE, &healthy).unwrap().unwrap().status, UrlStatus::Done);
    assert_eq!(storage.failed_urls().unwrap().len(), 1);
}

#[tokio::test]
async fn test_challenge_page_is_blocked() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let url = format!("{}/catalog/dresses/101", base);

    mount_html(
        &server,
        "/catalog/dresses/101",
        r#"<html><head><title>Just a moment...</title></head>
<body><div id="cf-challenge-running"></div></body></html>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage.enqueue_url(SITE, &url, UrlType::Product, 0, None).unwrap();

    let mut coordinator = coordinator(storage, crawl_options());
    coordinator.drain(&site, FrontierKind::Pages).await.unwrap();

    let storage = coordinator.storage();
    let item = storage.get_url(SITE, &url).unwrap().unwrap();
    assert_eq!(item.status, UrlStatus::Blocked);
    assert!(item.blocked);
    assert_eq!(item.last_http_status, Some(200));
    assert!(storage.get_product(SITE, &url).unwrap().is_none());
}

#[tokio::test]
async fn test_resume_processes_only_pending() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let finished = format!("{}/catalog/dresses/1", base);
    let pending = format!("{}/catalog/dresses/2", base);

    Mock::given(method("GET"))
        .and(path("/catalog/dresses/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/dresses/2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(product_page("def456", "Skirt", &[])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    {
        let mut storage = test_storage(&dir);
        storage.enqueue_url(SITE, &finished, UrlType::Product, 0, None).unwrap();
        storage.enqueue_url(SITE, &pending, UrlType::Product, 0, None).unwrap();
        storage
            .set_url_status(SITE, &finished, &UrlOutcome::done(200))
            .unwrap();
    }

    // A fresh process reopens the same database file
    let mut coordinator = coordinator(test_storage(&dir), crawl_options());
    let processed = coordinator.drain(&site, FrontierKind::Pages).await.unwrap();
    assert_eq!(processed, 1);
    assert_eq!(coordinator.storage().lookup_sku("DEF456").unwrap().len(), 1);
}

#[tokio::test]
async fn test_page_budget_stops_drain() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);

    mount_html(&server, "/catalog/a/1", product_page("a1", "A", &[])).await;
    mount_html(&server, "/catalog/b/2", product_page("b2", "B", &[])).await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage
        .enqueue_url(SITE, &format!("{}/catalog/a/1", base), UrlType::Product, 0, None)
        .unwrap();
    storage
        .enqueue_url(SITE, &format!("{}/catalog/b/2", base), UrlType::Product, 0, None)
        .unwrap();

    let options = CrawlConfig {
        max_pages: Some(1),
        ..crawl_options()
    };
    let mut coordinator = coordinator(storage, options);
    let processed = coordinator.drain(&site, FrontierKind::Pages).await.unwrap();
    assert_eq!(processed, 1);

    let stats = coordinator.storage().site_stats(SITE).unwrap();
    assert_eq!(stats.url_queue.get("pending"), Some(&1));
    assert_eq!(stats.url_queue.get("done"), Some(&1));
}

#[tokio::test]
async fn test_retry_errors_requeues_failed_urls() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let url = format!("{}/catalog/dresses/7", base);

    mount_html(&server, "/sitemap.xml", urlset(&[])).await;
    mount_html(&server, "/catalog/dresses/7", product_page("ghi789", "Coat", &[])).await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage.enqueue_url(SITE, &url, UrlType::Product, 0, None).unwrap();
    storage
        .set_url_status(SITE, &url, &UrlOutcome::error(Some(500), "HTTP 500"))
        .unwrap();

    let options = CrawlConfig {
        retry_errors: true,
        ..crawl_options()
    };
    let mut coordinator = coordinator(storage, options);
    let report = coordinator.crawl_site(&site).await.unwrap();

    assert_eq!(report.reset_errors, 1);
    assert_eq!(report.pages_processed, 1);

    let item = coordinator.storage().get_url(SITE, &url).unwrap().unwrap();
    assert_eq!(item.status, UrlStatus::Done);
    assert_eq!(item.attempts, 2);
    assert_eq!(item.last_error, None);
}

#[tokio::test]
async fn test_depth_bound_stops_discovery() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let root = format!("{}/catalog/dresses/1", base);

    let root_page = product_page("d1", "One", &["/catalog/dresses/2"]);
    mount_html(&server, "/catalog/dresses/1", root_page).await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage.enqueue_url(SITE, &root, UrlType::Product, 0, None).unwrap();

    let options = CrawlConfig {
        max_depth: 0,
        ..crawl_options()
    };
    let mut coordinator = coordinator(storage, options);
    coordinator.drain(&site, FrontierKind::Pages).await.unwrap();

    assert!(coordinator
        .storage()
        .get_url(SITE, &format!("{}/catalog/dresses/2", base))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_windows_1251_product_page_decoded() {
    let server = MockServer::start().await;
    let base = server.uri();
    let site = mock_site(&base);
    let url = format!("{}/catalog/dresses/1251", base);

    let (body, _, _) =
        encoding_rs::WINDOWS_1251.encode("<h1>Платье</h1><p>Код товара: 251TP2150</p>");
    Mock::given(method("GET"))
        .and(path("/catalog/dresses/1251"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.into_owned(), "text/html; charset=windows-1251"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut storage = test_storage(&dir);
    storage.enqueue_url(SITE, &url, UrlType::Product, 0, None).unwrap();

    let mut coordinator = coordinator(storage, crawl_options());
    coordinator.drain(&site, FrontierKind::Pages).await.unwrap();

    let product = coordinator.storage().get_product(SITE, &url).unwrap().unwrap();
    assert_eq!(product.sku.as_deref(), Some("251TP2150"));
    assert_eq!(product.title.as_deref(), Some("Платье"));
}
