use serde::{Deserialize, Serialize};

/// Frozen per-column statistics used for standardization.
///
/// `std_dev` is the population standard deviation (divide by N).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    /// Mean and population stddev of `values`; `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sum_sq: f64 = values
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum();
        Some(Self {
            mean,
            std_dev: (sum_sq / n).sqrt(),
        })
    }

    /// `(value - mean) / std_dev`, or `None` when `std_dev` is exactly zero.
    pub fn standardize(&self, value: f64) -> Option<f64> {
        if self.std_dev == 0.0 {
            return None;
        }
        Some((value - self.mean) / self.std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_std_divides_by_n() {
        let stats = ColumnStats::from_values(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert!((stats.std_dev - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn constant_column_cannot_standardize() {
        let stats = ColumnStats::from_values(&[4.0, 4.0]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.standardize(4.0), None);
    }

    #[test]
    fn empty_has_no_stats() {
        assert!(ColumnStats::from_values(&[]).is_none());
    }
}
