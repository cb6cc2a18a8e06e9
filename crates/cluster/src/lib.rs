//! Seeded k-means for survey embeddings.
//!
//! [`ClusterAssigner`] runs `n_init` independent restarts, each seeded with
//! k-means++ and refined by Lloyd iterations, and keeps the restart with the
//! lowest inertia (the earliest one on ties). Restart seeds are drawn from a
//! single master seed, so a fixed seed and fixed input always produce the
//! same centroids in the same order. Cluster ids are hand-mapped to advisory
//! texts downstream, which is why the seed is explicit.
//!
//! ```
//! use cluster::ClusterAssigner;
//! use reduce::Embedding;
//!
//! let points: Vec<Embedding> = [[0.0, 0.0], [0.1, 0.0], [5.0, 5.0], [5.1, 5.0]]
//!     .iter()
//!     .map(|p| Embedding::new(p.to_vec()))
//!     .collect();
//! let fitted = ClusterAssigner::new(2).fit(&points).unwrap();
//! let a = fitted.apply(&points[0]).unwrap();
//! let b = fitted.apply(&points[2]).unwrap();
//! assert_ne!(a, b);
//! ```

use std::fmt;
use std::time::Instant;

use fastrand::Rng;
use reduce::Embedding;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod error;
mod kmeans;

pub use crate::error::ClusterError;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Cluster id in `[0, k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u32);

impl GroupId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<GroupId> for i64 {
    fn from(id: GroupId) -> Self {
        i64::from(id.0)
    }
}

/// k-means configuration. Fit produces a [`FittedAssigner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterAssigner {
    n_clusters: usize,
    seed: u64,
    n_init: usize,
    max_iter: usize,
    tol: f64,
}

impl ClusterAssigner {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            seed: DEFAULT_SEED,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Relative tolerance, scaled by the mean per-feature variance of the input.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn fit(&self, embeddings: &[Embedding]) -> Result<FittedAssigner, ClusterError> {
        let start = Instant::now();
        self.validate()?;
        let first = embeddings.first().ok_or(ClusterError::EmptyInput)?;
        if self.n_clusters > embeddings.len() {
            return Err(ClusterError::InvalidClusterCount {
                k: self.n_clusters,
                samples: embeddings.len(),
            });
        }
        let width = first.len();
        for e in embeddings {
            check_embedding(e.as_slice(), width)?;
        }

        let points: Vec<&[f64]> = embeddings.iter().map(Embedding::as_slice).collect();
        let tol = self.tol * kmeans::mean_variance(&points);

        let mut master = Rng::with_seed(self.seed);
        let mut best: Option<kmeans::RunOutcome> = None;
        for restart in 0..self.n_init {
            let mut rng = Rng::with_seed(master.u64(..));
            let seeds = kmeans::seed_centroids(&points, self.n_clusters, &mut rng);
            let outcome = kmeans::lloyd(&points, seeds, self.max_iter, tol);
            debug!(
                restart,
                inertia = outcome.inertia,
                iterations = outcome.n_iter,
                "kmeans_restart"
            );
            let better = best
                .as_ref()
                .is_none_or(|current| outcome.inertia < current.inertia);
            if better {
                best = Some(outcome);
            }
        }

        let best = best.ok_or_else(|| ClusterError::InvalidParameter("n_init must be at least 1".into()))?;
        info!(
            k = self.n_clusters,
            samples = embeddings.len(),
            restarts = self.n_init,
            seed = self.seed,
            inertia = best.inertia,
            iterations = best.n_iter,
            elapsed_micros = start.elapsed().as_micros(),
            "kmeans_fit"
        );

        Ok(FittedAssigner {
            centroids: best.centroids,
            inertia: best.inertia,
            n_iter: best.n_iter,
            seed: self.seed,
        })
    }

    fn validate(&self) -> Result<(), ClusterError> {
        if self.n_clusters == 0 {
            return Err(ClusterError::InvalidClusterCount {
                k: 0,
                samples: 0,
            });
        }
        if self.n_init == 0 {
            return Err(ClusterError::InvalidParameter("n_init must be at least 1".into()));
        }
        if self.max_iter == 0 {
            return Err(ClusterError::InvalidParameter("max_iter must be at least 1".into()));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(ClusterError::InvalidParameter(format!(
                "tolerance must be a non-negative number, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Frozen centroids of the winning restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedAssigner {
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    n_iter: usize,
    seed: u64,
}

impl FittedAssigner {
    /// Nearest centroid by squared Euclidean distance; lowest id on ties.
    pub fn apply(&self, embedding: &Embedding) -> Result<GroupId, ClusterError> {
        check_embedding(embedding.as_slice(), self.width())?;
        let (idx, _) = kmeans::nearest(embedding.as_slice(), &self.centroids);
        Ok(GroupId(idx as u32))
    }

    pub fn predict_batch(&self, embeddings: &[Embedding]) -> Result<Vec<GroupId>, ClusterError> {
        embeddings.iter().map(|e| self.apply(e)).collect()
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    pub fn width(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Sum of squared distances to the nearest centroid over the training set.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn check_embedding(values: &[f64], width: usize) -> Result<(), ClusterError> {
    if values.len() != width {
        return Err(ClusterError::DimensionMismatch {
            expected: width,
            found: values.len(),
        });
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ClusterError::NonFiniteInput { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_MEANS: [[f64; 2]; 3] = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
    const OFFSETS: [[f64; 2]; 4] = [[0.1, 0.0], [-0.1, 0.0], [0.0, 0.1], [0.0, -0.1]];

    fn three_groups() -> Vec<Embedding> {
        GROUP_MEANS
            .iter()
            .flat_map(|m| {
                OFFSETS
                    .iter()
                    .map(move |o| Embedding::new(vec![m[0] + o[0], m[1] + o[1]]))
            })
            .collect()
    }

    #[test]
    fn recovers_three_tight_groups() {
        let fitted = ClusterAssigner::new(3).fit(&three_groups()).unwrap();
        assert_eq!(fitted.n_clusters(), 3);

        for mean in GROUP_MEANS {
            let closest = fitted
                .centroids()
                .iter()
                .map(|c| kmeans::squared_distance(c, &mean).sqrt())
                .fold(f64::INFINITY, f64::min);
            assert!(closest < 1e-9, "no centroid near {mean:?}");
        }
        assert!((fitted.inertia() - 12.0 * 0.01).abs() < 1e-9);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let data = three_groups();
        let a = ClusterAssigner::new(3).with_seed(7).fit(&data).unwrap();
        let b = ClusterAssigner::new(3).with_seed(7).fit(&data).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.predict_batch(&data).unwrap(), b.predict_batch(&data).unwrap());
    }

    #[test]
    fn members_of_a_group_share_an_id() {
        let data = three_groups();
        let fitted = ClusterAssigner::new(3).fit(&data).unwrap();
        let labels = fitted.predict_batch(&data).unwrap();
        for group in labels.chunks(OFFSETS.len()) {
            assert!(group.iter().all(|g| *g == group[0]));
        }
        let mut distinct: Vec<_> = labels.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn apply_stays_in_range() {
        let fitted = ClusterAssigner::new(3).fit(&three_groups()).unwrap();
        for x in -20..=20 {
            for y in -20..=20 {
                let id = fitted
                    .apply(&Embedding::new(vec![x as f64, y as f64]))
                    .unwrap();
                assert!(id.index() < 3);
            }
        }
    }

    #[test]
    fn equidistant_point_takes_lowest_id() {
        let fitted = FittedAssigner {
            centroids: vec![vec![-1.0], vec![1.0]],
            inertia: 0.0,
            n_iter: 1,
            seed: DEFAULT_SEED,
        };
        assert_eq!(fitted.apply(&Embedding::new(vec![0.0])).unwrap(), GroupId::new(0));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let data = three_groups();
        assert!(matches!(
            ClusterAssigner::new(0).fit(&data),
            Err(ClusterError::InvalidClusterCount { .. })
        ));
        assert_eq!(
            ClusterAssigner::new(13).fit(&data).unwrap_err(),
            ClusterError::InvalidClusterCount { k: 13, samples: 12 }
        );
        assert!(matches!(
            ClusterAssigner::new(3).with_n_init(0).fit(&data),
            Err(ClusterError::InvalidParameter(_))
        ));
        assert_eq!(ClusterAssigner::new(3).fit(&[]).unwrap_err(), ClusterError::EmptyInput);
    }

    #[test]
    fn apply_rejects_wrong_width() {
        let fitted = ClusterAssigner::new(3).fit(&three_groups()).unwrap();
        assert_eq!(
            fitted.apply(&Embedding::new(vec![1.0])).unwrap_err(),
            ClusterError::DimensionMismatch { expected: 2, found: 1 }
        );
    }

    #[test]
    fn group_id_converts_to_i64() {
        assert_eq!(i64::from(GroupId::new(4)), 4);
        assert_eq!(GroupId::new(2).to_string(), "2");
    }
}
