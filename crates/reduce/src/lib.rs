//! Principal component projection for standardized survey vectors.
//!
//! [`DimensionalityReducer::fit`] centers the training matrix, builds the
//! sample covariance (divided by `n - 1`) and keeps the eigenvectors of the
//! `K` largest eigenvalues, where `K = min(max_components, width)`. The
//! fitted [`FittedReducer`] projects any vector of the fitted width onto
//! those components.
//!
//! Eigenvector signs are pinned so that the largest-magnitude entry of each
//! component is positive. Refitting on the same data therefore yields the
//! same embedding coordinates, which keeps downstream cluster ids stable.

use std::cmp::Ordering;
use std::time::Instant;

use nalgebra::{DMatrix, SymmetricEigen};
use normalize::StandardizedVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod error;

pub use crate::error::ReduceError;

/// Upper bound on the embedding width used by the training pipeline.
pub const DEFAULT_MAX_COMPONENTS: usize = 5;

/// Fixed-width projection of a standardized vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl AsRef<[f64]> for Embedding {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// PCA fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionalityReducer {
    max_components: usize,
}

impl Default for DimensionalityReducer {
    fn default() -> Self {
        Self {
            max_components: DEFAULT_MAX_COMPONENTS,
        }
    }
}

impl DimensionalityReducer {
    pub fn new(max_components: usize) -> Self {
        Self { max_components }
    }

    pub fn max_components(&self) -> usize {
        self.max_components
    }

    /// Fit principal components on the training vectors.
    pub fn fit(&self, samples: &[StandardizedVector]) -> Result<FittedReducer, ReduceError> {
        let start = Instant::now();
        if self.max_components == 0 {
            return Err(ReduceError::InvalidComponents);
        }
        let first = samples.first().ok_or(ReduceError::EmptyInput)?;
        if samples.len() < 2 {
            return Err(ReduceError::InsufficientSamples {
                found: samples.len(),
            });
        }

        let n_samples = samples.len();
        let n_features = first.len();
        if n_features == 0 {
            return Err(ReduceError::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }
        for sample in samples {
            check_vector(sample.as_slice(), n_features)?;
        }

        let mut mean = vec![0.0; n_features];
        for sample in samples {
            for (m, &x) in mean.iter_mut().zip(sample.as_slice()) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n_samples as f64;
        }

        // Σ = Xcᵀ Xc / (n - 1)
        let denom = (n_samples - 1) as f64;
        let mut cov = DMatrix::<f64>::zeros(n_features, n_features);
        for sample in samples {
            let row = sample.as_slice();
            for i in 0..n_features {
                let ci = row[i] - mean[i];
                for j in i..n_features {
                    cov[(i, j)] += ci * (row[j] - mean[j]);
                }
            }
        }
        for i in 0..n_features {
            for j in i..n_features {
                let value = cov[(i, j)] / denom;
                cov[(i, j)] = value;
                cov[(j, i)] = value;
            }
        }

        let eigen = SymmetricEigen::try_new(cov, f64::EPSILON, 0).ok_or_else(|| {
            ReduceError::Decomposition("symmetric eigen solver did not converge".into())
        })?;
        let eigenvalues = eigen.eigenvalues;
        let eigenvectors = eigen.eigenvectors;

        // Descending; the stable sort keeps solver order among equal eigenvalues.
        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(Ordering::Equal)
        });

        let n_components = self.max_components.min(n_features);
        let total_variance: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();

        let mut components = Vec::with_capacity(n_components);
        let mut explained_variance = Vec::with_capacity(n_components);
        for &idx in order.iter().take(n_components) {
            let mut component: Vec<f64> = eigenvectors.column(idx).iter().copied().collect();
            flip_sign(&mut component);
            components.push(component);
            explained_variance.push(eigenvalues[idx].max(0.0));
        }
        let explained_variance_ratio: Vec<f64> = explained_variance
            .iter()
            .map(|&v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
            .collect();

        let all_finite = components.iter().flatten().all(|v| v.is_finite())
            && explained_variance.iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(ReduceError::Decomposition(
                "eigendecomposition produced non-finite values".into(),
            ));
        }

        debug!(explained_variance_ratio = ?explained_variance_ratio, "reducer_components");
        info!(
            samples = n_samples,
            input_width = n_features,
            components = n_components,
            retained_variance = explained_variance_ratio.iter().sum::<f64>(),
            elapsed_micros = start.elapsed().as_micros(),
            "reducer_fit"
        );

        Ok(FittedReducer {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }
}

/// Frozen mean and principal axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedReducer {
    mean: Vec<f64>,
    /// One row per component, each of the input width.
    components: Vec<Vec<f64>>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl FittedReducer {
    /// Project one standardized vector onto the fitted components.
    pub fn apply(&self, vector: &StandardizedVector) -> Result<Embedding, ReduceError> {
        self.project(vector.as_slice())
    }

    pub fn apply_batch(&self, vectors: &[StandardizedVector]) -> Result<Vec<Embedding>, ReduceError> {
        vectors.iter().map(|v| self.apply(v)).collect()
    }

    fn project(&self, values: &[f64]) -> Result<Embedding, ReduceError> {
        check_vector(values, self.input_width())?;
        let projected = self
            .components
            .iter()
            .map(|component| {
                component
                    .iter()
                    .zip(values.iter().zip(&self.mean))
                    .map(|(w, (x, m))| w * (x - m))
                    .sum()
            })
            .collect();
        Ok(Embedding(projected))
    }

    pub fn input_width(&self) -> usize {
        self.mean.len()
    }

    pub fn embedding_width(&self) -> usize {
        self.components.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn components(&self) -> &[Vec<f64>] {
        &self.components
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

fn check_vector(values: &[f64], width: usize) -> Result<(), ReduceError> {
    if values.len() != width {
        return Err(ReduceError::DimensionMismatch {
            expected: width,
            found: values.len(),
        });
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ReduceError::NonFiniteInput { index }),
        None => Ok(()),
    }
}

/// Make the largest-magnitude entry positive (first one wins on ties).
fn flip_sign(component: &mut [f64]) {
    let mut pivot = 0.0_f64;
    for &v in component.iter() {
        if v.abs() > pivot.abs() {
            pivot = v;
        }
    }
    if pivot < 0.0 {
        for v in component.iter_mut() {
            *v = -*v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors(rows: &[&[f64]]) -> Vec<StandardizedVector> {
        rows.iter().map(|r| StandardizedVector::new(r.to_vec())).collect()
    }

    /// Deterministic pseudo-data without pulling an RNG into the tests.
    fn synthetic(n: usize, width: usize) -> Vec<StandardizedVector> {
        (0..n)
            .map(|i| {
                (0..width)
                    .map(|j| (((i * 7 + j * 13) % 11) as f64 - 5.0) / 3.0 + (i as f64) * 0.1 * (j % 3) as f64)
                    .collect::<Vec<_>>()
                    .into()
            })
            .collect()
    }

    #[test]
    fn ten_by_eight_yields_width_five() {
        let data = synthetic(10, 8);
        let fitted = DimensionalityReducer::default().fit(&data).unwrap();

        assert_eq!(fitted.input_width(), 8);
        assert_eq!(fitted.embedding_width(), 5);
        for v in &data {
            assert_eq!(fitted.apply(v).unwrap().len(), 5);
        }
    }

    #[test]
    fn narrow_input_keeps_all_columns() {
        let data = vectors(&[&[1.0, 0.0], &[0.0, 1.0], &[-1.0, 0.5]]);
        let fitted = DimensionalityReducer::default().fit(&data).unwrap();
        assert_eq!(fitted.embedding_width(), 2);
    }

    #[test]
    fn first_component_follows_the_dominant_axis() {
        // Variance lies almost entirely along x = y.
        let data = vectors(&[
            &[-2.0, -2.1],
            &[-1.0, -0.9],
            &[0.0, 0.05],
            &[1.0, 1.0],
            &[2.0, 1.95],
        ]);
        let fitted = DimensionalityReducer::new(1).fit(&data).unwrap();
        let pc1 = &fitted.components()[0];
        let s = std::f64::consts::FRAC_1_SQRT_2;

        assert!((pc1[0] - s).abs() < 0.05);
        assert!((pc1[1] - s).abs() < 0.05);
        assert!(fitted.explained_variance_ratio()[0] > 0.99);
    }

    #[test]
    fn explained_variance_is_sorted_descending() {
        let fitted = DimensionalityReducer::default().fit(&synthetic(12, 6)).unwrap();
        let ev = fitted.explained_variance();
        assert!(ev.windows(2).all(|w| w[0] >= w[1]));
        assert!(fitted.explained_variance_ratio().iter().sum::<f64>() <= 1.0 + 1e-9);
    }

    #[test]
    fn components_have_positive_pivot() {
        let fitted = DimensionalityReducer::default().fit(&synthetic(10, 8)).unwrap();
        for component in fitted.components() {
            let pivot = component
                .iter()
                .copied()
                .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            assert!(pivot > 0.0);
        }
    }

    #[test]
    fn refit_is_identical() {
        let data = synthetic(10, 8);
        let a = DimensionalityReducer::default().fit(&data).unwrap();
        let b = DimensionalityReducer::default().fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_input() {
        let reducer = DimensionalityReducer::default();
        assert_eq!(reducer.fit(&[]).unwrap_err(), ReduceError::EmptyInput);
        assert_eq!(
            reducer.fit(&vectors(&[&[1.0, 2.0]])).unwrap_err(),
            ReduceError::InsufficientSamples { found: 1 }
        );
        assert_eq!(
            reducer
                .fit(&vectors(&[&[1.0, 2.0], &[1.0]]))
                .unwrap_err(),
            ReduceError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            DimensionalityReducer::new(0)
                .fit(&vectors(&[&[1.0], &[2.0]]))
                .unwrap_err(),
            ReduceError::InvalidComponents
        );
    }

    #[test]
    fn apply_checks_width_and_finiteness() {
        let fitted = DimensionalityReducer::default().fit(&synthetic(10, 4)).unwrap();
        assert!(matches!(
            fitted.apply(&StandardizedVector::new(vec![0.0; 3])),
            Err(ReduceError::DimensionMismatch { expected: 4, found: 3 })
        ));
        assert_eq!(
            fitted
                .apply(&StandardizedVector::new(vec![0.0, f64::NAN, 0.0, 0.0]))
                .unwrap_err(),
            ReduceError::NonFiniteInput { index: 1 }
        );
    }

    #[test]
    fn fitted_reducer_survives_serde() {
        let fitted = DimensionalityReducer::default().fit(&synthetic(10, 8)).unwrap();
        let json = serde_json::to_string(&fitted).unwrap();
        let back: FittedReducer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fitted);
    }
}
