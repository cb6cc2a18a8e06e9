//! Tabular training data and CSV loading.
//!
//! Cells are typed per column after the whole file is read: a column whose
//! every present cell parses as a float is numeric, anything else is
//! categorical and keeps the raw cell text. Empty cells and the usual NA
//! spellings are [`FeatureValue::Missing`].

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::info;

use crate::error::DataLoadError;
use crate::types::{FeatureValue, RawRecord};

/// Cell spellings read as missing.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Rows of [`FeatureValue`] cells under a fixed header.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<FeatureValue>>,
}

impl Dataset {
    /// Build a dataset, checking that the header is non-empty and unique and
    /// that every row has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<FeatureValue>>) -> Result<Self, DataLoadError> {
        if columns.is_empty() {
            return Err(DataLoadError::EmptyHeader);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(DataLoadError::DuplicateColumn(name.clone()));
            }
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != columns.len() {
                return Err(DataLoadError::RaggedRow {
                    row,
                    expected: columns.len(),
                    found: cells.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Read a CSV file with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| DataLoadError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "dataset_loaded"
        );
        Ok(dataset)
    }

    /// Read CSV from any reader. The first record is the header.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, DataLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()
            .map_err(|err| DataLoadError::Csv(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.is_empty() || columns.iter().all(String::is_empty) {
            return Err(DataLoadError::EmptyHeader);
        }

        let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
        for (row, result) in csv_reader.records().enumerate() {
            let record = result.map_err(|err| DataLoadError::Csv(err.to_string()))?;
            if record.len() != columns.len() {
                return Err(DataLoadError::RaggedRow {
                    row,
                    expected: columns.len(),
                    found: record.len(),
                });
            }
            raw_rows.push(
                record
                    .iter()
                    .map(|cell| (!NA_TOKENS.contains(&cell)).then(|| cell.to_string()))
                    .collect(),
            );
        }
        if raw_rows.is_empty() {
            return Err(DataLoadError::NoRows);
        }

        let numeric: Vec<bool> = (0..columns.len())
            .map(|col| {
                raw_rows
                    .iter()
                    .filter_map(|row| row[col].as_deref())
                    .all(|cell| parse_number(cell).is_some())
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&numeric)
                    .map(|(cell, &is_numeric)| match cell {
                        None => FeatureValue::Missing,
                        Some(text) if is_numeric => match parse_number(&text) {
                            Some(value) => FeatureValue::Number(value),
                            None => FeatureValue::Category(text),
                        },
                        Some(text) => FeatureValue::Category(text),
                    })
                    .collect()
            })
            .collect();

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FeatureValue>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row `index` as a keyed record, if it exists.
    pub fn record(&self, index: usize) -> Option<RawRecord> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok()
}
