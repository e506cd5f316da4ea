use cfmv_core::{CfmvError, Dataset, EngineConfig, FeatureMask, Record, Result};
use tracing::{debug, info, warn};

use super::cluster::Cluster;

/// Result of a full k-means run.
#[derive(Debug, Clone)]
pub struct ClusterRun {
    /// Final clusters, in seed order. Membership is from the last assignment
    /// round.
    pub clusters: Vec<Cluster>,
    /// Number of clusters.
    pub k: usize,
    /// Number of assign/recompute rounds performed.
    pub iterations: usize,
    /// False when the iteration cap was hit before every cluster settled.
    pub converged: bool,
}

impl ClusterRun {
    /// Member count per cluster.
    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Cluster::len).collect()
    }

}

/// Centroid-based partitioning of a [`Dataset`].
///
/// Seeding is deterministic: centroids start at the midpoints of `k`
/// equal-width bins over each complete feature's range. Features with any
/// missing cell are left out of every distance and centroid computation.
#[derive(Debug, Clone, Default)]
pub struct ClusterEngine {
    config: EngineConfig,
}

impl ClusterEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run k-means over the records of `dataset`.
    ///
    /// Iterates until every cluster is finished or `max_iterations` rounds
    /// have run. Hitting the cap is not an error: the clusters found so far
    /// come back with `converged = false`.
    pub fn run(&self, dataset: &Dataset, k: usize) -> Result<ClusterRun> {
        self.config.validate()?;
        validate_k(dataset, k)?;

        let mask = dataset.distance_mask();
        if mask.active_count() == 0 {
            warn!("every feature has missing values, all records will share one cluster");
        }
        if !dataset.is_standardized() {
            debug!("clustering a data set that is not standardized");
        }

        info!(k, records = dataset.len(), "running k-means");

        let mut clusters = seed_clusters(dataset, k, &mask);
        let mut iterations = 0;
        let mut converged = true;

        while !clusters.iter().all(Cluster::is_finished) {
            if iterations == self.config.max_iterations {
                warn!(
                    k,
                    iterations,
                    "k-means did not converge, returning best-so-far clusters"
                );
                converged = false;
                break;
            }
            iterations += 1;

            for cluster in clusters.iter_mut() {
                cluster.clear();
            }
            assign_records(dataset, &mut clusters, &mask);
            recompute_centroids(dataset, &mut clusters, &mask, self.config.tolerance);
        }

        info!(iterations, converged, "k-means finished");
        for (i, cluster) in clusters.iter().enumerate() {
            info!(
                cluster = i + 1,
                points = cluster.len(),
                objective = cluster.objective(dataset, &mask),
                "cluster size"
            );
        }

        Ok(ClusterRun {
            clusters,
            k,
            iterations,
            converged,
        })
    }
}

/// `k` must be at least 1 and no larger than the number of records.
pub fn validate_k(dataset: &Dataset, k: usize) -> Result<()> {
    if dataset.is_empty() || dataset.feature_count() == 0 {
        return Err(CfmvError::InvalidArgument(
            "data set must have at least one record and one feature".to_string(),
        ));
    }
    if k < 1 {
        return Err(CfmvError::InvalidArgument(
            "k must be at least 1".to_string(),
        ));
    }
    if k > dataset.len() {
        return Err(CfmvError::InvalidArgument(format!(
            "k ({}) must be <= number of records ({})",
            k,
            dataset.len()
        )));
    }
    Ok(())
}

/// Initial clusters: for each active feature, split `[min, max]` into `k`
/// bins and place centroid `i` at the midpoint of bin `i`. Inactive features
/// are fixed at 0.
pub fn seed_clusters(dataset: &Dataset, k: usize, mask: &FeatureMask) -> Vec<Cluster> {
    let n_features = dataset.feature_count();
    let ranges: Vec<Option<(f64, f64)>> = (0..n_features)
        .map(|f| mask.is_active(f).then(|| dataset.feature_range(f)))
        .collect();

    let clusters: Vec<Cluster> = (0..k)
        .map(|i| {
            let values = ranges
                .iter()
                .map(|range| match range {
                    Some((lo, hi)) => {
                        let step = (hi - lo) / k as f64;
                        lo + step / 2.0 + i as f64 * step
                    }
                    None => 0.0,
                })
                .collect();
            Cluster::new(Record::new(values))
        })
        .collect();

    for (i, cluster) in clusters.iter().enumerate() {
        debug!(cluster = i + 1, centroid = %cluster.centroid(), "initial centroid");
    }
    clusters
}

/// Put every record into the cluster with the nearest centroid.
fn assign_records(dataset: &Dataset, clusters: &mut [Cluster], mask: &FeatureMask) {
    for (i, record) in dataset.records().iter().enumerate() {
        let nearest = nearest_cluster(record.values(), clusters, mask);
        clusters[nearest].add_member(i, record);
    }

    let sizes: Vec<usize> = clusters.iter().map(Cluster::len).collect();
    debug!(?sizes, "points assigned");
}

/// Index of the nearest centroid; the first one wins a tie.
fn nearest_cluster(point: &[f64], clusters: &[Cluster], mask: &FeatureMask) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::MAX;
    for (i, cluster) in clusters.iter().enumerate() {
        let dist = mask.squared_distance(point, cluster.centroid().values());
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

/// Move each centroid to the mean of its members.
///
/// An empty cluster is finished with its centroid untouched. A cluster whose
/// mean lies within `tolerance` of the current centroid on every active
/// feature is finished and keeps the current centroid.
fn recompute_centroids(
    dataset: &Dataset,
    clusters: &mut [Cluster],
    mask: &FeatureMask,
    tolerance: f64,
) {
    let n_features = dataset.feature_count();

    for (i, cluster) in clusters.iter_mut().enumerate() {
        if cluster.is_empty() {
            cluster.mark_finished();
            debug!(cluster = i + 1, "centroid unchanged (empty)");
            continue;
        }

        let mut mean = vec![0.0; n_features];
        for &idx in cluster.members() {
            let values = dataset.record(idx).values();
            for f in mask.active() {
                mean[f] += values[f];
            }
        }
        let count = cluster.len() as f64;
        for f in mask.active() {
            mean[f] /= count;
        }

        if within_tolerance(cluster.centroid().values(), &mean, mask, tolerance) {
            cluster.mark_finished();
            debug!(cluster = i + 1, "centroid unchanged");
        } else {
            let centroid = Record::new(mean);
            debug!(cluster = i + 1, centroid = %centroid, "centroid moved");
            cluster.set_centroid(centroid);
        }
    }
}

/// Whether every active feature moved by at most `tolerance`.
fn within_tolerance(old: &[f64], new: &[f64], mask: &FeatureMask, tolerance: f64) -> bool {
    mask.active().all(|f| (old[f] - new[f]).abs() <= tolerance)
}
