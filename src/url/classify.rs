use crate::config::SiteConfig;
use crate::state::UrlType;

/// Classifies a URL for a site
///
/// The URL is normalized under the site's rules first. Rules apply in order:
/// stale pattern, product pattern, category pattern. A product-pattern match
/// whose parser needs a SKU in the URL, but finds none, is demoted to
/// category. Unparseable URLs are `Other`.
pub fn classify_url(site: &SiteConfig, url: &str) -> UrlType {
    let clean = match site.normalize(url) {
        Ok(clean) => clean,
        Err(_) => return UrlType::Other,
    };

    if let Some(stale) = &site.stale_pattern {
        if stale.is_match(&clean) {
            return UrlType::Other;
        }
    }

    if site.product_pattern.is_match(&clean) {
        if site.parser.requires_url_sku() && site.parser.sku_from_url(&clean).is_none() {
            return UrlType::Category;
        }
        return UrlType::Product;
    }

    if site.category_pattern.is_match(&clean) {
        return UrlType::Category;
    }

    UrlType::Other
}
