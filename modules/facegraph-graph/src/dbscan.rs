//! Density-based clustering over face embeddings.
//!
//! Standard DBSCAN with Euclidean distance. Callers pass L2-normalized
//! embeddings so the metric approximates cosine distance. A point is a core
//! point if its eps-neighborhood, including the point itself, holds at least
//! `min_samples` members; clusters grow from core points, non-core points
//! within eps of a core point are absorbed, everything else is noise.
//!
//! Label assignment order does not affect the partition for well-separated
//! clusters. Borderline chains can be order-sensitive; that matches the
//! reference behavior and is accepted.

/// Run DBSCAN over the given points.
///
/// Returns one label per point: `-1` for noise, positive labels (1, 2, ...)
/// identify clusters. Degenerate parameters degrade gracefully — a huge eps
/// yields one giant cluster, a tiny one yields all noise.
pub fn dbscan(points: &[Vec<f64>], eps: f64, min_samples: usize) -> Vec<i32> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    const UNDEFINED: i32 = 0;
    const NOISE: i32 = -1;

    let mut labels = vec![UNDEFINED; n];
    let mut cluster_id: i32 = 0;

    for i in 0..n {
        if labels[i] != UNDEFINED {
            continue;
        }

        let neighbors = range_query(points, i, eps);
        if neighbors.len() < min_samples {
            labels[i] = NOISE;
            continue;
        }

        // i is a core point: start a new cluster.
        cluster_id += 1;
        labels[i] = cluster_id;

        // Seed set: neighbors minus point i.
        let mut seed: Vec<usize> = neighbors.into_iter().filter(|&j| j != i).collect();
        let mut cursor = 0;

        while cursor < seed.len() {
            let q = seed[cursor];
            cursor += 1;

            if labels[q] == NOISE {
                // Border point: absorbed, but does not expand the cluster.
                labels[q] = cluster_id;
            }
            if labels[q] != UNDEFINED {
                continue;
            }
            labels[q] = cluster_id;

            let q_neighbors = range_query(points, q, eps);
            if q_neighbors.len() >= min_samples {
                seed.extend(q_neighbors);
            }
        }
    }

    labels
}

/// Indices of all points within eps Euclidean distance of points[idx],
/// including idx itself.
fn range_query(points: &[Vec<f64>], idx: usize, eps: f64) -> Vec<usize> {
    let q = &points[idx];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| euclidean(q, p) <= eps)
        .map(|(i, _)| i)
        .collect()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
