//! Tabular inputs: persona rows, tone map, brand rules and the product catalog.
//!
//! Every table is read once per run with the `csv` crate into a [`Table`] of
//! header → value records. Empty cells and `nan` placeholders are dropped at
//! read time so downstream code only ever sees present values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub mod brand;
pub mod catalog;
pub mod persona;
pub mod rules;
pub mod scoring;
pub mod tone;

/// Errors raised while loading input tables.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A required input file does not exist.
    #[error("required data file not found: {}", .0.display())]
    MissingFile(PathBuf),
    /// The file exists but is not readable CSV.
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        /// Offending file.
        path: PathBuf,
        /// Underlying reader error.
        #[source]
        source: csv::Error,
    },
    /// The table lacks columns the loader depends on.
    #[error("{} is missing required columns: {}", path.display(), columns.join(", "))]
    MissingColumns {
        /// Offending file.
        path: PathBuf,
        /// Column names that were not found.
        columns: Vec<String>,
    },
    /// The persona table has no rows for the requested persona.
    #[error("no rows found for persona '{0}'")]
    PersonaNotFound(String),
    /// Neither the brand-filtered nor the full catalog has a sellable product.
    #[error("product catalog has no sellable products")]
    EmptyCatalog,
}

/// One table row keyed by trimmed header. Absent cells are not stored.
pub type Record = BTreeMap<String, String>;

/// A parsed CSV table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Source path, kept for error messages.
    pub path: PathBuf,
    /// Trimmed headers in file order.
    pub headers: Vec<String>,
    /// Records in file order.
    pub rows: Vec<Record>,
}

impl Table {
    /// Fail with [`DataError::MissingColumns`] unless every column is present.
    ///
    /// # Errors
    ///
    /// Returns the list of absent columns.
    pub fn require_columns(&self, columns: &[&str]) -> Result<(), DataError> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.headers.iter().any(|h| h == *c))
            .map(|c| (*c).to_owned())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::MissingColumns {
                path: self.path.clone(),
                columns: missing,
            })
        }
    }

    /// First candidate column name present in the headers.
    pub fn pick_column(&self, candidates: &[&str]) -> Option<String> {
        candidates
            .iter()
            .find(|c| self.headers.iter().any(|h| h == *c))
            .map(|c| (*c).to_owned())
    }
}

/// Read a required CSV table.
///
/// # Errors
///
/// Returns [`DataError::MissingFile`] if `path` does not exist and
/// [`DataError::Csv`] if it cannot be parsed.
pub fn read_table(path: &Path) -> Result<Table, DataError> {
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    let csv_err = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{FEFF}').trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let row: Record = headers
            .iter()
            .zip(record.iter())
            .filter_map(|(h, v)| clean_cell(v).map(|v| (h.clone(), v)))
            .collect();
        rows.push(row);
    }

    Ok(Table {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Read a CSV table that may legitimately be absent.
///
/// # Errors
///
/// Returns [`DataError::Csv`] if the file exists but cannot be parsed.
pub fn read_optional_table(path: &Path) -> Result<Option<Table>, DataError> {
    match read_table(path) {
        Ok(table) => Ok(Some(table)),
        Err(DataError::MissingFile(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Trimmed cell value, or `None` for empty and `nan` cells.
pub fn clean_cell(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("nan") || v.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(v.to_owned())
    }
}

/// Split a comma-separated cell into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').filter_map(clean_cell).collect()
}

/// Split a tag cell on `,`, `/`, `;` and `|`.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', '/', ';', '|']).filter_map(clean_cell).collect()
}
