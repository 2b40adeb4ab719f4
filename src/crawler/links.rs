//! Link extraction from fetched pages

use crate::product::text::dedupe_keep_order;
use crate::url::normalize_url;
use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable link on a page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `#fragment`, `javascript:`, `mailto:`, `tel:` and `data:` hrefs
/// - Anything that does not resolve to an http(s) URL
///
/// Results are absolute, stripped of query and fragment, and de-duplicated
/// in document order. Site filtering is left to the caller.
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href], link[rel='canonical'][href]") {
        for element in document.select(&selector) {
            if let Some(link) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, page_url))
            {
                links.push(link);
            }
        }
    }

    dedupe_keep_order(links)
}

/// Resolves an href against the page URL and normalizes it
///
/// Returns None for special schemes, same-page anchors and URLs that fail
/// to resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}
