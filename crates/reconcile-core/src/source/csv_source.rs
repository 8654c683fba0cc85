use super::{ExternalRow, RowSource, SourceError, SourceResult, rows_from_grid};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Reads spreadsheet exports from disk: `<root>/<source_id>/<sheet>.csv`.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    root: PathBuf,
}

impl CsvRowSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn sheet_path(&self, source_id: &str, sheet_name: &str) -> PathBuf {
        self.root.join(source_id).join(format!("{sheet_name}.csv"))
    }
}

impl RowSource for CsvRowSource {
    fn fetch(&self, source_id: &str, sheet_name: &str) -> SourceResult<Vec<ExternalRow>> {
        let path = self.sheet_path(source_id, sheet_name);
        if !path.exists() {
            return Err(SourceError::SheetNotFound(path.display().to_string()));
        }
        load_rows_from_csv(&path)
    }
}

pub fn load_rows_from_csv<P: AsRef<Path>>(path: P) -> SourceResult<Vec<ExternalRow>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(rows_from_grid(grid))
}
