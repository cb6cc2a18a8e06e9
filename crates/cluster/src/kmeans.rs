//! One k-means restart: k-means++ seeding followed by Lloyd iterations.

use fastrand::Rng;

pub(crate) struct RunOutcome {
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub n_iter: usize,
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the closest centroid and its squared distance. Lowest index wins ties.
pub(crate) fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

/// k-means++: first center uniform, then D²-weighted sampling.
pub(crate) fn seed_centroids(points: &[&[f64]], k: usize, rng: &mut Rng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(points[rng.usize(..n)].to_vec());

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.f64() * total;
            let mut acc = 0.0;
            let mut pick = n - 1;
            for (idx, &d) in closest.iter().enumerate() {
                acc += d;
                if acc > target && d > 0.0 {
                    pick = idx;
                    break;
                }
            }
            pick
        } else {
            // Every point coincides with a center already.
            rng.usize(..n)
        };

        let center = points[chosen].to_vec();
        for (slot, p) in closest.iter_mut().zip(points) {
            let d = squared_distance(p, &center);
            if d < *slot {
                *slot = d;
            }
        }
        centroids.push(center);
    }
    centroids
}

/// Lloyd iterations from the given seeds until the squared centroid shift
/// drops to `tol` or `max_iter` is reached.
pub(crate) fn lloyd(
    points: &[&[f64]],
    mut centroids: Vec<Vec<f64>>,
    max_iter: usize,
    tol: f64,
) -> RunOutcome {
    let k = centroids.len();
    let width = centroids.first().map_or(0, Vec::len);
    let mut labels = vec![usize::MAX; points.len()];
    let mut n_iter = 0;

    for iteration in 1..=max_iter {
        n_iter = iteration;
        let mut changed = false;
        let mut distances = Vec::with_capacity(points.len());
        for (label, p) in labels.iter_mut().zip(points) {
            let (idx, d) = nearest(p, &centroids);
            if *label != idx {
                *label = idx;
                changed = true;
            }
            distances.push(d);
        }

        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (&label, p) in labels.iter().zip(points) {
            counts[label] += 1;
            for (s, &x) in sums[label].iter_mut().zip(p.iter()) {
                *s += x;
            }
        }

        // Empty clusters take the points farthest from their current centroid.
        let mut taken = vec![false; points.len()];
        for cluster in 0..k {
            if counts[cluster] > 0 {
                continue;
            }
            let far = distances
                .iter()
                .enumerate()
                .filter(|(idx, _)| !taken[*idx] && counts[labels[*idx]] > 1)
                .fold(None, |best: Option<(usize, f64)>, (idx, &d)| match best {
                    Some((_, bd)) if bd >= d => best,
                    _ => Some((idx, d)),
                });
            if let Some((idx, _)) = far {
                let old = labels[idx];
                for (s, &x) in sums[old].iter_mut().zip(points[idx].iter()) {
                    *s -= x;
                }
                counts[old] -= 1;
                sums[cluster] = points[idx].to_vec();
                counts[cluster] = 1;
                labels[idx] = cluster;
                taken[idx] = true;
                changed = true;
            }
        }

        let mut shift = 0.0;
        for cluster in 0..k {
            if counts[cluster] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums[cluster]
                .iter()
                .map(|s| s / counts[cluster] as f64)
                .collect();
            shift += squared_distance(&updated, &centroids[cluster]);
            centroids[cluster] = updated;
        }

        if !changed || shift <= tol {
            break;
        }
    }

    let inertia = points.iter().map(|p| nearest(p, &centroids).1).sum();
    RunOutcome {
        centroids,
        inertia,
        n_iter,
    }
}

/// Mean per-feature variance, used to scale the convergence tolerance.
pub(crate) fn mean_variance(points: &[&[f64]]) -> f64 {
    let n = points.len() as f64;
    let width = points.first().map_or(0, |p| p.len());
    if width == 0 || points.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for j in 0..width {
        let mean = points.iter().map(|p| p[j]).sum::<f64>() / n;
        total += points.iter().map(|p| (p[j] - mean).powi(2)).sum::<f64>() / n;
    }
    total / width as f64
}
