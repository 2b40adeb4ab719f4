//! Output module for exports and article matching
//!
//! This module handles:
//! - Exporting the SKU index and failed URLs as CSV
//! - Writing the crawl summary JSON
//! - Loading article lists and matching them against the SKU index

pub mod articles;
mod export;
mod matcher;

pub use articles::{ArticleSource, DEFAULT_ARTICLE_COLUMN, DEFAULT_PART_COLUMN};
pub use export::{
    export_crawl, export_csv, CrawlSummary, ExportPaths, CRAWL_SUMMARY_FILE, SKU_INDEX_FILE,
    URL_ERRORS_FILE,
};
pub use matcher::{
    match_articles, normalize_articles, write_match_report, MatchOutputs, MatchReport, MatchRow,
    FOUND_FILE, MISSING_FILE, SUMMARY_FILE,
};
