//! Error types produced by the normalize crate.
//!
//! Two error surfaces live here:
//!
//! - [`DataLoadError`] covers reading a training CSV. Every variant is fatal
//!   for the batch job that asked for the data.
//! - [`NormalizeError`] covers fitting and applying the normalizer. On the
//!   serving path these are input validation failures and map to a 4xx
//!   rejection.
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`EmptyDataset`](NormalizeError::EmptyDataset) | fit | no rows survived loading |
//! | [`LeadingMissing`](NormalizeError::LeadingMissing) | fit | first row of a column is missing, nothing to forward-fill from |
//! | [`UnknownCategory`](NormalizeError::UnknownCategory) | apply | category never observed during fit |
//! | [`DegenerateColumn`](NormalizeError::DegenerateColumn) | apply / fit_transform | fitted stddev is exactly zero |
//! | [`MissingColumn`](NormalizeError::MissingColumn) | apply | record lacks a fitted column |
//! | [`UnexpectedColumn`](NormalizeError::UnexpectedColumn) | apply | record carries a column unknown at fit time |
//! | [`MissingValue`](NormalizeError::MissingValue) | apply | a serving record holds a null cell |
//! | [`TypeMismatch`](NormalizeError::TypeMismatch) | fit / apply | text where a number was fitted |
//! | [`NonFiniteValue`](NormalizeError::NonFiniteValue) | fit / apply | NaN or infinity in a numeric cell |
//!
//! ```rust
//! use normalize::NormalizeError;
//!
//! let err = NormalizeError::UnknownCategory {
//!     column: "Unusual_Bleeding".into(),
//!     value: "maybe".into(),
//! };
//! assert_eq!(err.http_status_code(), 422);
//! assert!(err.to_string().contains("maybe"));
//! ```

use thiserror::Error;

/// Failures while loading a tabular dataset from disk or a reader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DataLoadError {
    /// The file could not be opened or read.
    #[error("failed to read dataset {path}: {reason}")]
    Io { path: String, reason: String },

    /// The CSV reader rejected the input.
    #[error("malformed csv: {0}")]
    Csv(String),

    /// The header row is absent or has no columns.
    #[error("dataset has no header columns")]
    EmptyHeader,

    /// Two header cells share a name.
    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),

    /// A data row does not have one cell per header column.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The header parsed but no data rows follow it.
    #[error("dataset contains no data rows")]
    NoRows,
}

/// Errors raised while fitting or applying a [`FittedNormalizer`](crate::FittedNormalizer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    /// Fit was called with zero rows.
    #[error("cannot fit normalizer on an empty dataset")]
    EmptyDataset,

    /// Forward-fill has no earlier observation to copy into the first row.
    #[error("column `{column}` is missing in its first row; nothing to forward-fill from")]
    LeadingMissing { column: String },

    /// A categorical value was never observed during fit.
    #[error("unknown category `{value}` for column `{column}`")]
    UnknownCategory { column: String, value: String },

    /// The fitted standard deviation of a column is exactly zero.
    #[error("column `{column}` has zero standard deviation; cannot standardize")]
    DegenerateColumn { column: String },

    /// A fitted column is absent from the record.
    #[error("record is missing column `{0}`")]
    MissingColumn(String),

    /// The record carries a column that was not present at fit time.
    #[error("record has unexpected column `{0}`")]
    UnexpectedColumn(String),

    /// A serving record holds an explicit null for a column.
    #[error("record has no value for column `{0}`")]
    MissingValue(String),

    /// Text was supplied for a column fitted as numeric.
    #[error("column `{column}` expects a number, got `{value}`")]
    TypeMismatch { column: String, value: String },

    /// NaN or infinity in a numeric cell.
    #[error("column `{column}` holds a non-finite value")]
    NonFiniteValue { column: String },
}

impl NormalizeError {
    /// Suggested HTTP status when the error reaches a request handler.
    ///
    /// Every normalizer failure is a rejection of the submitted record.
    pub fn http_status_code(&self) -> u16 {
        422
    }

    /// Name of the column the error is about, when there is one.
    pub fn column(&self) -> Option<&str> {
        match self {
            NormalizeError::EmptyDataset => None,
            NormalizeError::LeadingMissing { column }
            | NormalizeError::UnknownCategory { column, .. }
            | NormalizeError::DegenerateColumn { column }
            | NormalizeError::TypeMismatch { column, .. }
            | NormalizeError::NonFiniteValue { column } => Some(column),
            NormalizeError::MissingColumn(column)
            | NormalizeError::UnexpectedColumn(column)
            | NormalizeError::MissingValue(column) => Some(column),
        }
    }
}
