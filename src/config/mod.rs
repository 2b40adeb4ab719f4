//! Configuration module for the Twinset indexer
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file and compiles site profiles into their runtime form.
//!
//! # Example
//!
//! ```no_run
//! use twinset_indexer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("indexer.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod sites;
mod types;
mod validation;

// Re-export types
pub use sites::SiteConfig;
pub use types::{
    Config, CrawlConfig, HttpConfig, OutputConfig, SiteEntry, DEFAULT_USER_AGENT,
};

// Re-export parser and validation functions
pub use parser::load_config;
pub use validation::validate;

use crate::{ConfigError, ConfigResult};

/// Selector name that expands to every configured site
pub const ALL_SITES: &str = "both";

impl Config {
    /// Returns the site entries in effect: built-ins first, with file entries
    /// replacing a built-in of the same key or appended after them
    pub fn site_entries(&self) -> Vec<SiteEntry> {
        let mut entries = SiteEntry::builtin();
        for entry in &self.sites {
            match entries.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => *existing = entry.clone(),
                None => entries.push(entry.clone()),
            }
        }
        entries
    }

    /// Resolves a site selector into compiled profiles
    ///
    /// `"both"` selects every site in order; any other value must name a
    /// site key exactly.
    pub fn resolve_sites(&self, selector: &str) -> ConfigResult<Vec<SiteConfig>> {
        let entries = self.site_entries();
        let selected: Vec<&SiteEntry> = if selector == ALL_SITES {
            entries.iter().collect()
        } else {
            entries.iter().filter(|e| e.key == selector).collect()
        };

        if selected.is_empty() {
            let known: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
            return Err(ConfigError::Validation(format!(
                "Unknown site '{}', expected one of: {}, {}",
                selector,
                known.join(", "),
                ALL_SITES
            )));
        }

        selected.into_iter().map(SiteConfig::from_entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_both_keeps_order() {
        let config = Config::default();
        let sites = config.resolve_sites("both").unwrap();
        let keys: Vec<&str> = sites.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["twinset.ru", "twinset.com"]);
    }

    #[test]
    fn test_resolve_single_site() {
        let config = Config::default();
        let sites = config.resolve_sites("twinset.com").unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].base_url, "https://www.twinset.com");
    }

    #[test]
    fn test_resolve_unknown_site() {
        let config = Config::default();
        assert!(config.resolve_sites("twinset.de").is_err());
    }

    #[test]
    fn test_file_entry_overrides_builtin() {
        let mut config = Config::default();
        let mut entry = SiteEntry::twinset_ru();
        entry.base_url = "http://127.0.0.1:8080".to_string();
        config.sites.push(entry);

        let entries = config.site_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].base_url, "http://127.0.0.1:8080");
    }
}
