use std::collections::VecDeque;

use crate::FaceSortError;
use crate::distance::DistanceMatrix;
use crate::oracle::{ClusterOracle, ClusterParams, NOISE_LABEL};

/// Default neighbourhood radius in cosine distance.
pub const DEFAULT_EPS: f32 = 0.5;

/// DBSCAN over a precomputed distance matrix.
///
/// A point is a core point when at least `min_samples` points (itself
/// included) lie within `eps`. Clusters with fewer than `min_cluster_size`
/// members are demoted to noise. Surviving clusters are labelled `0, 1, ...`
/// in order of discovery.
#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    pub eps: f32,
}

impl Dbscan {
    pub fn new(eps: f32) -> Self {
        Self { eps }
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(DEFAULT_EPS)
    }
}

impl ClusterOracle for Dbscan {
    fn cluster(
        &self,
        distances: &DistanceMatrix,
        params: ClusterParams,
    ) -> Result<Vec<i32>, FaceSortError> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(FaceSortError::Cluster(format!("invalid eps {}", self.eps)));
        }
        let labels = dbscan(distances, self.eps, params.min_samples.max(1));
        Ok(drop_small_clusters(labels, params.min_cluster_size))
    }
}

const UNDEFINED: i32 = -2;

/// Runs DBSCAN. Returns one label per row, [`NOISE_LABEL`] for noise.
fn dbscan(distances: &DistanceMatrix, eps: f32, min_pts: usize) -> Vec<i32> {
    let n = distances.len();
    let mut labels = vec![UNDEFINED; n];
    let mut cluster_id: i32 = -1;

    for i in 0..n {
        if labels[i] != UNDEFINED {
            continue;
        }

        let neighbors = range_query(distances, i, eps);
        if neighbors.len() < min_pts {
            labels[i] = NOISE_LABEL;
            continue;
        }

        cluster_id += 1;
        labels[i] = cluster_id;

        let mut seed: VecDeque<usize> = neighbors.into_iter().filter(|&j| j != i).collect();
        while let Some(q) = seed.pop_front() {
            if labels[q] == NOISE_LABEL {
                // Border point.
                labels[q] = cluster_id;
            }
            if labels[q] != UNDEFINED {
                continue;
            }
            labels[q] = cluster_id;

            let q_neighbors = range_query(distances, q, eps);
            if q_neighbors.len() >= min_pts {
                seed.extend(q_neighbors);
            }
        }
    }

    labels
}

/// Returns indices of all rows within eps of row `idx`, `idx` included.
fn range_query(distances: &DistanceMatrix, idx: usize, eps: f32) -> Vec<usize> {
    distances
        .row(idx)
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d <= eps)
        .map(|(i, _)| i)
        .collect()
}

/// Turns clusters below `min_size` into noise and renumbers the rest densely.
fn drop_small_clusters(labels: Vec<i32>, min_size: usize) -> Vec<i32> {
    let max = labels.iter().copied().max().unwrap_or(NOISE_LABEL);
    if max < 0 {
        return labels;
    }
    let mut sizes = vec![0usize; max as usize + 1];
    for &l in &labels {
        if l >= 0 {
            sizes[l as usize] += 1;
        }
    }
    let mut remap = vec![NOISE_LABEL; sizes.len()];
    let mut next = 0;
    for (old, &size) in sizes.iter().enumerate() {
        if size >= min_size && size > 0 {
            remap[old] = next;
            next += 1;
        }
    }
    labels
        .into_iter()
        .map(|l| if l >= 0 { remap[l as usize] } else { l })
        .collect()
}
