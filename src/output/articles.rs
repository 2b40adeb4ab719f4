//! Article list sources for the match command

use crate::output::matcher::normalize_articles;
use crate::product::text::normalize_space;
use crate::IndexerError;
use calamine::{open_workbook_auto, Data, Reader};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ARTICLE_COLUMN: &str = "article";
pub const DEFAULT_PART_COLUMN: &str = "Parte";

const UTF8_BOM: char = '\u{feff}';

/// Where the articles to match come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleSource {
    /// CSV file; `column` falls back to the first column when absent
    Csv { path: PathBuf, column: String },
    /// Spreadsheet worksheet (first sheet unless named)
    Spreadsheet {
        path: PathBuf,
        sheet: Option<String>,
        part_column: String,
    },
    /// Comma-separated list given on the command line
    Inline(String),
}

impl ArticleSource {
    /// Loads the articles, normalized, uppercased and de-duplicated
    pub fn load(&self) -> crate::Result<Vec<String>> {
        match self {
            Self::Csv { path, column } => articles_from_csv(path, column),
            Self::Spreadsheet {
                path,
                sheet,
                part_column,
            } => articles_from_spreadsheet(path, sheet.as_deref(), part_column),
            Self::Inline(list) => Ok(normalize_articles(list.split(','))),
        }
    }
}

/// Reads one column of a CSV file
pub fn articles_from_csv(path: &Path, column: &str) -> crate::Result<Vec<String>> {
    if !path.exists() {
        return Err(IndexerError::Articles(format!(
            "CSV not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let index = headers.iter().position(|h| h == column).unwrap_or(0);

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(record.get(index).unwrap_or_default().to_string());
    }
    Ok(normalize_articles(values))
}

/// Reads the part-number column of a spreadsheet worksheet
///
/// The first row is the header; the column is matched case-insensitively
/// after whitespace normalization.
pub fn articles_from_spreadsheet(
    path: &Path,
    sheet: Option<&str>,
    part_column: &str,
) -> crate::Result<Vec<String>> {
    if !path.exists() {
        return Err(IndexerError::Articles(format!(
            "Spreadsheet not found: {}",
            path.display()
        )));
    }

    let mut workbook =
        open_workbook_auto(path).map_err(|e| IndexerError::Spreadsheet(e.to_string()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IndexerError::Spreadsheet("workbook has no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IndexerError::Spreadsheet(format!("sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let wanted = normalize_space(part_column).to_lowercase();
    let index = header
        .iter()
        .position(|cell| normalize_space(&cell_text(cell)).to_lowercase() == wanted)
        .ok_or_else(|| {
            IndexerError::Articles(format!(
                "column '{}' not found in sheet '{}'",
                part_column, sheet_name
            ))
        })?;

    let values = rows.filter_map(|row| row.get(index).map(cell_text));
    Ok(normalize_articles(values))
}

/// Text of a cell; whole numbers lose their ".0"
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
