//! Pipeline tuning parameters

use serde::{Deserialize, Serialize};

/// Default iteration cap for k-means discretization
pub const DEFAULT_KMEANS_MAX_ITERATIONS: usize = 100;

/// Default convergence tolerance on centroid movement
pub const DEFAULT_KMEANS_TOLERANCE: f64 = 1e-9;

/// Row count above which a dataset is flagged as large
pub const DEFAULT_LARGE_DATASET_THRESHOLD: usize = 10_000;

/// Configuration shared by every pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum assign/update rounds for k-means clustering
    pub kmeans_max_iterations: usize,
    /// Stop k-means once no centroid moves more than this
    pub kmeans_tolerance: f64,
    /// Datasets with more rows than this carry the large-dataset flag
    pub large_dataset_threshold: usize,
    /// Use rayon for per-column statistics and k-means assignment
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kmeans_max_iterations: DEFAULT_KMEANS_MAX_ITERATIONS,
            kmeans_tolerance: DEFAULT_KMEANS_TOLERANCE,
            large_dataset_threshold: DEFAULT_LARGE_DATASET_THRESHOLD,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    pub fn is_large(&self, row_count: usize) -> bool {
        row_count > self.large_dataset_threshold
    }
}
