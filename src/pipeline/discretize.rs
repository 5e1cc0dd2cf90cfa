//! Discretizers mapping numeric values to group indices
//!
//! Each discretizer is built once from all defined values of a column and
//! then predicts a zero-based group index for single values.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use super::column::DiscretizeMethod;
use super::config::PipelineConfig;
use super::value::normalized_bits;

/// Maps a value to its group index
pub trait Discretizer: Send + Sync {
    fn predict(&self, value: f64) -> usize;
}

/// Build the discretizer for `method`.
///
/// `values` must be non-empty and `groups` at least 1.
pub fn build_discretizer(
    method: DiscretizeMethod,
    groups: usize,
    values: &[f64],
    config: &PipelineConfig,
) -> Box<dyn Discretizer> {
    match method {
        DiscretizeMethod::Width => Box::new(EqualWidth::new(values, groups)),
        DiscretizeMethod::Frequency => Box::new(EqualFrequency::new(values, groups)),
        DiscretizeMethod::Cluster => Box::new(KMeans::new(values, groups, config)),
    }
}

/// Equal-width buckets: `floor((x - min) / ((max - min) / groups))`
#[derive(Debug, Clone)]
pub struct EqualWidth {
    min: f64,
    width: f64,
    groups: usize,
}

impl EqualWidth {
    pub fn new(values: &[f64], groups: usize) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            min,
            width: (max - min) / groups as f64,
            groups,
        }
    }
}

impl Discretizer for EqualWidth {
    fn predict(&self, value: f64) -> usize {
        if self.width <= 0.0 || !self.width.is_finite() {
            return 0;
        }
        let index = ((value - self.min) / self.width).floor();
        // The maximum itself lands on `groups`; fold it into the last bucket
        (index.max(0.0) as usize).min(self.groups - 1)
    }
}

/// Equal-frequency buckets: `floor(rank(x) / (n / groups))`, where `rank`
/// is the position of the first sorted value not less than `x`
#[derive(Debug, Clone)]
pub struct EqualFrequency {
    sorted: Vec<f64>,
    groups: usize,
}

impl EqualFrequency {
    pub fn new(values: &[f64], groups: usize) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self { sorted, groups }
    }
}

impl Discretizer for EqualFrequency {
    fn predict(&self, value: f64) -> usize {
        let rank = self.sorted.partition_point(|v| *v < value);
        let per_group = self.sorted.len() as f64 / self.groups as f64;
        ((rank as f64 / per_group).floor() as usize).min(self.groups - 1)
    }
}

/// One-dimensional k-means.
///
/// Labels are ordered by centroid, so group 0 is the lowest cluster.
/// Prediction goes through a value-to-label map built at construction;
/// values never seen during fitting fall back to the nearest centroid.
#[derive(Debug, Clone)]
pub struct KMeans {
    centroids: Vec<f64>,
    labels: HashMap<u64, usize>,
}

impl KMeans {
    pub fn new(values: &[f64], groups: usize, config: &PipelineConfig) -> Self {
        let mut distinct = values.to_vec();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();

        let k = groups.min(distinct.len()).max(1);
        // Deterministic start: centroids at evenly spaced ranks of the distinct values
        let mut centroids: Vec<f64> = (0..k)
            .map(|i| {
                let pos = ((i as f64 + 0.5) * distinct.len() as f64 / k as f64).floor() as usize;
                distinct[pos.min(distinct.len() - 1)]
            })
            .collect();

        let mut assignment = vec![0usize; values.len()];
        let mut iterations = 0;
        while iterations < config.kmeans_max_iterations {
            iterations += 1;
            assignment = assign(values, &centroids, config.parallel);

            let mut sums = vec![0.0; k];
            let mut counts = vec![0usize; k];
            for (&v, &label) in values.iter().zip(&assignment) {
                sums[label] += v;
                counts[label] += 1;
            }

            let mut shift = 0.0f64;
            for i in 0..k {
                // Empty clusters keep their previous centroid
                if counts[i] > 0 {
                    let next = sums[i] / counts[i] as f64;
                    shift = shift.max((next - centroids[i]).abs());
                    centroids[i] = next;
                }
            }
            if shift <= config.kmeans_tolerance {
                break;
            }
        }
        debug!(k, iterations, "k-means converged");

        // Relabel so that labels follow centroid order
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| centroids[a].total_cmp(&centroids[b]));
        let mut rank = vec![0usize; k];
        for (position, &cluster) in order.iter().enumerate() {
            rank[cluster] = position;
        }

        let labels = values
            .iter()
            .zip(&assignment)
            .map(|(&v, &cluster)| (normalized_bits(v), rank[cluster]))
            .collect();
        let centroids = order.iter().map(|&i| centroids[i]).collect();

        Self { centroids, labels }
    }

    pub fn centroids(&self) -> &[f64] {
        &self.centroids
    }
}

impl Discretizer for KMeans {
    fn predict(&self, value: f64) -> usize {
        self.labels
            .get(&normalized_bits(value))
            .copied()
            .unwrap_or_else(|| nearest_centroid(value, &self.centroids))
    }
}

fn nearest_centroid(value: f64, centroids: &[f64]) -> usize {
    let mut best = 0;
    for (i, c) in centroids.iter().enumerate() {
        if (value - c).abs() < (value - centroids[best]).abs() {
            best = i;
        }
    }
    best
}

fn assign(values: &[f64], centroids: &[f64], parallel: bool) -> Vec<usize> {
    if parallel {
        values
            .par_iter()
            .map(|&v| nearest_centroid(v, centroids))
            .collect()
    } else {
        values
            .iter()
            .map(|&v| nearest_centroid(v, centroids))
            .collect()
    }
}
