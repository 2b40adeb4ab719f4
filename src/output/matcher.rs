//! Article matching against the SKU index

use crate::output::export::{absolute, csv_writer};
use crate::product::text::{dedupe_keep_order, normalize_space};
use crate::storage::{timestamp_now, Storage};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const FOUND_FILE: &str = "articles_found.csv";
pub const MISSING_FILE: &str = "articles_missing.csv";
pub const SUMMARY_FILE: &str = "articles_summary.json";

const FOUND_COLUMNS: &[&str] = &["article", "site", "url", "title", "category_path", "updated_at"];
const MISSING_COLUMNS: &[&str] = &["article"];

/// One hit: an article found at one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRow {
    pub article: String,
    pub site: String,
    pub url: String,
    pub title: Option<String>,
    pub category_path: Option<String>,
    pub updated_at: String,
}

/// Result of matching a list of articles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Number of distinct normalized articles looked up
    pub total_articles: usize,
    pub found: Vec<MatchRow>,
    pub missing: Vec<String>,
}

impl MatchReport {
    pub fn found_articles(&self) -> usize {
        self.total_articles - self.missing.len()
    }

    pub fn missing_articles(&self) -> usize {
        self.missing.len()
    }
}

/// Files written by `write_match_report`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutputs {
    pub found_csv: String,
    pub missing_csv: String,
    pub summary_json: String,
}

#[derive(Serialize)]
struct MatchSummary<'a> {
    total_articles: usize,
    found_articles: usize,
    missing_articles: usize,
    generated_at: String,
    found_csv: &'a str,
    missing_csv: &'a str,
}

/// Whitespace-collapses and uppercases articles, dropping blanks and
/// repeats (first occurrence wins)
pub fn normalize_articles<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedupe_keep_order(
        raw.into_iter()
            .map(|a| normalize_space(a.as_ref()).to_uppercase())
            .filter(|a| !a.is_empty()),
    )
}

/// Looks every article up in the SKU index
///
/// Produces one found row per (article, URL) and lists articles with no hit
/// as missing. Read-only.
pub fn match_articles<S: AsRef<str>>(
    storage: &dyn Storage,
    articles: &[S],
) -> crate::Result<MatchReport> {
    let articles = normalize_articles(articles);
    let mut report = MatchReport {
        total_articles: articles.len(),
        ..MatchReport::default()
    };

    for article in articles {
        let entries = storage.lookup_sku(&article)?;
        if entries.is_empty() {
            report.missing.push(article);
            continue;
        }
        for entry in entries {
            report.found.push(MatchRow {
                article: article.clone(),
                site: entry.site,
                url: entry.url,
                title: entry.title,
                category_path: entry.category_path,
                updated_at: entry.updated_at,
            });
        }
    }

    Ok(report)
}

/// Writes the found/missing CSVs and the JSON summary into `dir`
pub fn write_match_report(report: &MatchReport, dir: &Path) -> crate::Result<MatchOutputs> {
    fs::create_dir_all(dir)?;
    let found_path = dir.join(FOUND_FILE);
    let missing_path = dir.join(MISSING_FILE);
    let summary_path = dir.join(SUMMARY_FILE);

    let mut writer = csv_writer(&found_path, FOUND_COLUMNS)?;
    for row in &report.found {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let mut writer = csv_writer(&missing_path, MISSING_COLUMNS)?;
    for article in &report.missing {
        writer.write_record([article])?;
    }
    writer.flush()?;

    let outputs = MatchOutputs {
        found_csv: absolute(&found_path)?.display().to_string(),
        missing_csv: absolute(&missing_path)?.display().to_string(),
        summary_json: absolute(&summary_path)?.display().to_string(),
    };

    let summary = MatchSummary {
        total_articles: report.total_articles,
        found_articles: report.found_articles(),
        missing_articles: report.missing_articles(),
        generated_at: timestamp_now(),
        found_csv: &outputs.found_csv,
        missing_csv: &outputs.missing_csv,
    };
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    info!(
        "match: {} articles, {} found, {} missing",
        report.total_articles,
        report.found_articles(),
        report.missing_articles()
    );
    Ok(outputs)
}
