//! twinset.com product pages
//!
//! Product URLs end in `-<sku>[_<variant>].html`, so the SKU normally comes
//! from the URL alone and the page only supplies title and breadcrumbs.

use super::text::normalize_space;
use super::{first_h1, ProductFields};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static URL_SKU_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-([0-9]{3}[A-Z]{2,5}[0-9A-Z]{2,})(?:_[0-9A-Z]+)?\.html$")
        .expect("hardcoded regex pattern is valid")
});

static PRODUCT_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)Product code:\s*<span class="value">([^<]+)</span>"#)
        .expect("hardcoded regex pattern is valid")
});

/// Extracts the uppercased SKU from the last path segment of a product URL
pub(crate) fn sku_from_url(url: &str) -> Option<String> {
    URL_SKU_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}

pub(crate) fn parse(html: &str, url: &str) -> ProductFields {
    let sku = sku_from_url(url).or_else(|| {
        PRODUCT_CODE_REGEX
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| normalize_space(m.as_str()).to_uppercase())
            .filter(|code| !code.is_empty())
    });

    ProductFields {
        sku,
        title: first_h1(html),
        category_path: breadcrumb_path(html),
    }
}

fn breadcrumb_path(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"li[class*="breadcrumb-item"]"#).ok()?;

    let crumbs: Vec<String> = document
        .select(&selector)
        .map(|li| normalize_space(&li.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    (!crumbs.is_empty()).then(|| crumbs.join(" > "))
}
