//! Product page extraction
//!
//! Each site has its own page layout, so extraction is a closed set of
//! parser variants selected by the site profile.

pub mod text;
mod twinset_com;
mod twinset_ru;

use scraper::{Html, Selector};
use text::normalize_space;

/// Fields extracted from a product page; every field is best-effort
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub sku: Option<String>,
    pub title: Option<String>,
    pub category_path: Option<String>,
}

impl ProductFields {
    /// Collapses whitespace, uppercases the SKU, and turns empty values into None
    pub fn normalized(self) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| normalize_space(&v))
                .filter(|v| !v.is_empty())
        };
        Self {
            sku: clean(self.sku).map(|s| s.to_uppercase()),
            title: clean(self.title),
            category_path: clean(self.category_path),
        }
    }
}

/// Product parser variant for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductParser {
    /// twinset.ru: `window.vueProduct` JSON with HTML fallbacks
    TwinsetRu,
    /// twinset.com: SKU from the URL, title and breadcrumbs from HTML
    TwinsetCom,
}

impl ProductParser {
    /// Looks up a parser by its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "twinset-ru" => Some(Self::TwinsetRu),
            "twinset-com" => Some(Self::TwinsetCom),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TwinsetRu => "twinset-ru",
            Self::TwinsetCom => "twinset-com",
        }
    }

    /// Returns true if product URLs must carry a SKU to count as products
    pub fn requires_url_sku(&self) -> bool {
        matches!(self, Self::TwinsetCom)
    }

    /// SKU encoded in the URL, for sites that encode one
    pub fn sku_from_url(&self, url: &str) -> Option<String> {
        match self {
            Self::TwinsetRu => None,
            Self::TwinsetCom => twinset_com::sku_from_url(url),
        }
    }

    /// Extracts product fields from a fetched page
    ///
    /// Never fails: fields that cannot be found are None.
    pub fn parse(&self, html: &str, url: &str) -> ProductFields {
        let fields = match self {
            Self::TwinsetRu => twinset_ru::parse(html),
            Self::TwinsetCom => twinset_com::parse(html, url),
        };
        fields.normalized()
    }
}

/// Text of the first `<h1>`, whitespace-normalized
pub(crate) fn first_h1(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("h1").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| normalize_space(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}
