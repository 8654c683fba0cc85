//! Tabular sources that feed the spreadsheet task sync.

use std::collections::BTreeMap;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// One spreadsheet row with cells keyed by normalized header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRow {
    /// 1-based row number in the sheet, header row included.
    pub row_number: usize,
    cells: BTreeMap<String, String>,
}

impl ExternalRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: BTreeMap::new(),
        }
    }

    pub fn with_cell(mut self, header: &str, value: impl Into<String>) -> Self {
        self.insert(header, value);
        self
    }

    pub fn insert(&mut self, header: &str, value: impl Into<String>) {
        self.cells.insert(normalize_header(header), value.into());
    }

    /// Trimmed, non-empty value of the first header alias present in the row.
    pub fn get(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.cells
                .get(&normalize_header(alias))
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        })
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|value| value.trim().is_empty())
    }
}

pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Zips a header row with value rows, skipping blank rows. Short rows are
/// padded with empty cells and extra cells beyond the header are dropped.
pub fn rows_from_grid(grid: Vec<Vec<String>>) -> Vec<ExternalRow> {
    let mut lines = grid.into_iter();
    let Some(headers) = lines.next() else {
        return Vec::new();
    };
    lines
        .enumerate()
        .filter_map(|(idx, values)| {
            let mut row = ExternalRow::new(idx + 2);
            for (col, header) in headers.iter().enumerate() {
                if header.trim().is_empty() {
                    continue;
                }
                row.insert(header, values.get(col).cloned().unwrap_or_default());
            }
            (!row.is_blank()).then_some(row)
        })
        .collect()
}

pub trait RowSource {
    fn fetch(&self, source_id: &str, sheet_name: &str) -> SourceResult<Vec<ExternalRow>>;
}

pub mod csv_source;

pub use csv_source::CsvRowSource;
