//! CSV exports and the crawl summary
//!
//! The column sets below are consumed by downstream spreadsheets, so their
//! order is fixed.

use crate::config::OutputConfig;
use crate::storage::{timestamp_now, QueueItem, SiteStats, Storage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SKU_INDEX_FILE: &str = "sku_index.csv";
pub const URL_ERRORS_FILE: &str = "url_errors.csv";
pub const CRAWL_SUMMARY_FILE: &str = "crawl_summary.json";

const SKU_INDEX_COLUMNS: &[&str] = &["site", "sku", "url", "title", "category_path", "updated_at"];

const URL_ERRORS_COLUMNS: &[&str] = &[
    "site",
    "url",
    "url_type",
    "status",
    "attempts",
    "blocked",
    "last_http_status",
    "last_error",
    "updated_at",
];

/// Locations of the files written by `export_csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPaths {
    pub sku_index_csv: String,
    pub errors_csv: String,
}

/// Summary of a crawl run, written to `crawl_summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub generated_at: String,
    pub site: String,
    pub db_path: String,
    pub log_path: String,
    pub exports: ExportPaths,
    pub stats: BTreeMap<String, SiteStats>,
}

/// One row of `url_errors.csv`
#[derive(Debug, Serialize)]
struct ErrorRow<'a> {
    site: &'a str,
    url: &'a str,
    url_type: &'static str,
    status: &'static str,
    attempts: u32,
    blocked: u8,
    last_http_status: Option<u16>,
    last_error: Option<&'a str>,
    updated_at: &'a str,
}

impl<'a> From<&'a QueueItem> for ErrorRow<'a> {
    fn from(item: &'a QueueItem) -> Self {
        Self {
            site: &item.site,
            url: &item.url,
            url_type: item.url_type.to_db_string(),
            status: item.status.to_db_string(),
            attempts: item.attempts,
            blocked: u8::from(item.blocked),
            last_http_status: item.last_http_status,
            last_error: item.last_error.as_deref(),
            updated_at: &item.updated_at,
        }
    }
}

/// Opens a CSV writer that always emits `columns` as the header row,
/// even when no data rows follow
pub(crate) fn csv_writer(path: &Path, columns: &[&str]) -> crate::Result<csv::Writer<fs::File>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(columns)?;
    Ok(writer)
}

/// Writes `sku_index.csv` and `url_errors.csv` into `export_dir`
///
/// The SKU index is ordered by site, SKU, then newest first; the error list
/// holds every error/blocked URL, newest first.
pub fn export_csv(storage: &dyn Storage, export_dir: &Path) -> crate::Result<ExportPaths> {
    fs::create_dir_all(export_dir)?;
    let sku_path = export_dir.join(SKU_INDEX_FILE);
    let errors_path = export_dir.join(URL_ERRORS_FILE);

    let mut writer = csv_writer(&sku_path, SKU_INDEX_COLUMNS)?;
    for entry in storage.sku_entries()? {
        writer.serialize(&entry)?;
    }
    writer.flush()?;

    let mut writer = csv_writer(&errors_path, URL_ERRORS_COLUMNS)?;
    for item in storage.failed_urls()? {
        writer.serialize(ErrorRow::from(&item))?;
    }
    writer.flush()?;

    Ok(ExportPaths {
        sku_index_csv: sku_path.display().to_string(),
        errors_csv: errors_path.display().to_string(),
    })
}

/// Exports the CSVs and writes `crawl_summary.json` next to them
pub fn export_crawl(
    storage: &dyn Storage,
    output: &OutputConfig,
    selector: &str,
    stats: BTreeMap<String, SiteStats>,
) -> crate::Result<CrawlSummary> {
    let export_dir = Path::new(&output.export_dir);
    let exports = export_csv(storage, export_dir)?;

    let summary = CrawlSummary {
        generated_at: timestamp_now(),
        site: selector.to_string(),
        db_path: absolute(Path::new(&output.db_path))?.display().to_string(),
        log_path: absolute(Path::new(&output.log_path))?.display().to_string(),
        exports,
        stats,
    };

    let summary_path = export_dir.join(CRAWL_SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    tracing::info!("summary: {}", summary_path.display());

    Ok(summary)
}

/// Resolves `path` against the working directory without touching the
/// filesystem
pub(crate) fn absolute(path: &Path) -> crate::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
