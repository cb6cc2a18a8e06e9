//! Feature normalization for survey records.
//!
//! This is the first stage of the cycle clustering pipeline. Raw survey rows
//! come in as a mix of numbers and category labels; they leave as dense,
//! standardized `f64` vectors whose column order is fixed at fit time.
//!
//! ## What happens during fit
//!
//! 1. **Forward-fill** missing cells column by column. A column whose first
//!    row is missing fails the fit with [`NormalizeError::LeadingMissing`].
//! 2. **Encode** every column that holds text. Labels get integer codes in
//!    lexicographic order (see [`CategoryEncoder`]).
//! 3. **Measure** mean and population standard deviation per column.
//!
//! The fitted statistics are frozen. [`FittedNormalizer::apply`] never
//! recomputes them, and applying the normalizer to a training row reproduces
//! the vector produced during fit bit for bit, because both paths run the
//! same arithmetic.
//!
//! ## Example
//!
//! ```
//! use normalize::{Dataset, FeatureNormalizer, FeatureValue, RawRecord};
//!
//! let dataset = Dataset::new(
//!     vec!["A".into(), "B".into()],
//!     vec![
//!         vec![FeatureValue::Number(1.0), FeatureValue::from("x")],
//!         vec![FeatureValue::Number(2.0), FeatureValue::from("y")],
//!         vec![FeatureValue::Number(3.0), FeatureValue::from("x")],
//!     ],
//! )
//! .unwrap();
//!
//! let (fitted, vectors) = FeatureNormalizer::fit_transform(&dataset).unwrap();
//! let again = fitted
//!     .apply(&RawRecord::new().with("A", 1.0).with("B", "x"))
//!     .unwrap();
//! assert_eq!(again, vectors[0]);
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

mod dataset;
mod encoder;
mod error;
mod fill;
mod scaler;
mod types;

pub use crate::dataset::Dataset;
pub use crate::encoder::CategoryEncoder;
pub use crate::error::{DataLoadError, NormalizeError};
pub use crate::scaler::ColumnStats;
pub use crate::types::{ColumnKind, EncodedRecord, FeatureValue, RawRecord, StandardizedVector};

use crate::fill::forward_fill;

/// Fits a [`FittedNormalizer`] from a [`Dataset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    /// Fit encoders and column statistics.
    pub fn fit(dataset: &Dataset) -> Result<FittedNormalizer, NormalizeError> {
        Self::fit_encoded(dataset).map(|(fitted, _)| fitted)
    }

    /// Fit and return the standardized training rows alongside the fitted state.
    ///
    /// Fails with [`NormalizeError::DegenerateColumn`] when a column is
    /// constant, since no row can be standardized against it.
    pub fn fit_transform(
        dataset: &Dataset,
    ) -> Result<(FittedNormalizer, Vec<StandardizedVector>), NormalizeError> {
        let (fitted, encoded) = Self::fit_encoded(dataset)?;
        let vectors = encoded
            .iter()
            .map(|row| fitted.standardize(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((fitted, vectors))
    }

    fn fit_encoded(
        dataset: &Dataset,
    ) -> Result<(FittedNormalizer, Vec<EncodedRecord>), NormalizeError> {
        let start = Instant::now();
        if dataset.is_empty() {
            return Err(NormalizeError::EmptyDataset);
        }

        let columns = dataset.columns();
        let filled = forward_fill(columns, dataset.rows())?;

        let mut fitted_columns = Vec::with_capacity(columns.len());
        let mut encoded_columns: Vec<Vec<f64>> = Vec::with_capacity(columns.len());
        for (col, name) in columns.iter().enumerate() {
            let cells = filled.iter().map(|row| &row[col]);
            let categorical = cells
                .clone()
                .any(|cell| matches!(cell, FeatureValue::Category(_)));

            let (encoder, values) = if categorical {
                let labels: Vec<String> = cells.filter_map(FeatureValue::category_key).collect();
                let encoder = CategoryEncoder::fit(labels.iter().cloned());
                let values = labels
                    .iter()
                    .map(|label| {
                        encoder
                            .encode(label)
                            .map(f64::from)
                            .ok_or_else(|| NormalizeError::UnknownCategory {
                                column: name.clone(),
                                value: label.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (Some(encoder), values)
            } else {
                let values = cells
                    .map(|cell| numeric_cell(name, cell))
                    .collect::<Result<Vec<_>, _>>()?;
                (None, values)
            };

            let stats = ColumnStats::from_values(&values).ok_or(NormalizeError::EmptyDataset)?;
            if stats.std_dev == 0.0 {
                warn!(column = %name, "normalizer_constant_column");
            }
            debug!(
                column = %name,
                categorical,
                mean = stats.mean,
                std_dev = stats.std_dev,
                "normalizer_column_fit"
            );
            fitted_columns.push(FittedColumn {
                name: name.clone(),
                encoder,
                stats,
            });
            encoded_columns.push(values);
        }

        let fitted = FittedNormalizer {
            columns: fitted_columns,
        };
        let encoded = (0..filled.len())
            .map(|row| EncodedRecord::new(encoded_columns.iter().map(|c| c[row]).collect()))
            .collect();

        info!(
            rows = dataset.n_rows(),
            columns = fitted.width(),
            categorical = fitted.categorical_columns().count(),
            elapsed_micros = start.elapsed().as_micros(),
            "normalizer_fit"
        );
        Ok((fitted, encoded))
    }
}

/// Fitted state of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumn {
    pub name: String,
    /// Present for categorical columns only.
    pub encoder: Option<CategoryEncoder>,
    pub stats: ColumnStats,
}

impl FittedColumn {
    pub fn kind(&self) -> ColumnKind {
        if self.encoder.is_some() {
            ColumnKind::Categorical
        } else {
            ColumnKind::Numeric
        }
    }

    fn encode(&self, value: &FeatureValue) -> Result<f64, NormalizeError> {
        if value.is_missing() {
            return Err(NormalizeError::MissingValue(self.name.clone()));
        }
        match &self.encoder {
            Some(encoder) => {
                let label = value.category_key().unwrap_or_default();
                encoder
                    .encode(&label)
                    .map(f64::from)
                    .ok_or_else(|| NormalizeError::UnknownCategory {
                        column: self.name.clone(),
                        value: label,
                    })
            }
            None => numeric_cell(&self.name, value),
        }
    }
}

/// Frozen encoding and standardization state for a fixed, ordered column set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNormalizer {
    columns: Vec<FittedColumn>,
}

impl FittedNormalizer {
    pub fn columns(&self) -> &[FittedColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = &FittedColumn> {
        self.columns.iter().filter(|c| c.encoder.is_some())
    }

    /// Number of columns, i.e. the width of every [`StandardizedVector`].
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Substitute category codes; the record must carry exactly the fitted columns.
    pub fn encode(&self, record: &RawRecord) -> Result<EncodedRecord, NormalizeError> {
        if let Some(extra) = record
            .column_names()
            .find(|name| !self.columns.iter().any(|c| c.name == *name))
        {
            return Err(NormalizeError::UnexpectedColumn(extra.to_string()));
        }

        let values = self
            .columns
            .iter()
            .map(|column| {
                let value = record
                    .get(&column.name)
                    .ok_or_else(|| NormalizeError::MissingColumn(column.name.clone()))?;
                column.encode(value)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EncodedRecord::new(values))
    }

    /// Encode and standardize one record with the frozen statistics.
    pub fn apply(&self, record: &RawRecord) -> Result<StandardizedVector, NormalizeError> {
        let encoded = self.encode(record)?;
        self.standardize(&encoded)
    }

    fn standardize(&self, encoded: &EncodedRecord) -> Result<StandardizedVector, NormalizeError> {
        self.columns
            .iter()
            .zip(encoded.as_slice())
            .map(|(column, &value)| {
                column
                    .stats
                    .standardize(value)
                    .ok_or_else(|| NormalizeError::DegenerateColumn {
                        column: column.name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(StandardizedVector::new)
    }
}

fn numeric_cell(column: &str, cell: &FeatureValue) -> Result<f64, NormalizeError> {
    let value = match cell {
        FeatureValue::Number(value) => *value,
        FeatureValue::Category(text) => {
            text.trim()
                .parse::<f64>()
                .map_err(|_| NormalizeError::TypeMismatch {
                    column: column.to_string(),
                    value: text.clone(),
                })?
        }
        FeatureValue::Missing => return Err(NormalizeError::MissingValue(column.to_string())),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NormalizeError::NonFiniteValue {
            column: column.to_string(),
        })
    }
}
