//! Compiled site profiles
//!
//! A `SiteConfig` is the runtime form of a `SiteEntry`: patterns are compiled
//! and the parser variant is resolved, so classification and extraction never
//! fail once a site has been loaded.

use crate::config::types::SiteEntry;
use crate::product::ProductParser;
use crate::state::UrlType;
use crate::url::{classify_url, normalize_url};
use crate::{ConfigError, ConfigResult, UrlResult};
use regex::Regex;

/// Site profile with compiled patterns
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub key: String,
    pub base_url: String,
    pub sitemap_candidates: Vec<String>,
    pub seed_category_urls: Vec<String>,
    pub product_pattern: Regex,
    pub category_pattern: Regex,
    pub stale_pattern: Option<Regex>,
    pub parser: ProductParser,
    pub trim_trailing_slash: bool,
}

impl SiteConfig {
    /// Compiles a site entry into a runtime profile
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` if a regex does not compile and
    /// `ConfigError::Validation` if the parser name is unknown.
    pub fn from_entry(entry: &SiteEntry) -> ConfigResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                site: entry.key.clone(),
                message: e.to_string(),
            })
        };

        let parser = ProductParser::from_name(&entry.parser).ok_or_else(|| {
            ConfigError::Validation(format!(
                "Unknown parser '{}' for site '{}'",
                entry.parser, entry.key
            ))
        })?;

        Ok(Self {
            key: entry.key.clone(),
            base_url: entry.base_url.clone(),
            sitemap_candidates: entry.sitemap_candidates.clone(),
            seed_category_urls: entry.seed_category_urls.clone(),
            product_pattern: compile(&entry.product_pattern)?,
            category_pattern: compile(&entry.category_pattern)?,
            stale_pattern: entry.stale_pattern.as_deref().map(compile).transpose()?,
            parser,
            trim_trailing_slash: entry.trim_trailing_slash,
        })
    }

    /// Normalizes a URL under this site's rules
    ///
    /// Query and fragment are always dropped; sites with
    /// `trim_trailing_slash` also lose a trailing slash on non-root paths.
    pub fn normalize(&self, raw: &str) -> UrlResult<String> {
        let mut normalized = normalize_url(raw)?;
        if self.trim_trailing_slash {
            while normalized.ends_with('/') && !is_root(&normalized) {
                normalized.pop();
            }
        }
        Ok(normalized)
    }

    /// Classifies a URL as product, category or other
    pub fn classify(&self, raw: &str) -> UrlType {
        classify_url(self, raw)
    }

    /// Returns true if the URL lives under this site's base URL
    pub fn is_same_site(&self, url: &str) -> bool {
        url.starts_with(&self.base_url)
    }
}

/// True for `scheme://host/` with nothing after the slash
fn is_root(url: &str) -> bool {
    url.split_once("://")
        .map(|(_, rest)| rest.find('/').map(|i| i + 1 == rest.len()).unwrap_or(true))
        .unwrap_or(true)
}
