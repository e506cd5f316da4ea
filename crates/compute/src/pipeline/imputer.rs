use cfmv_core::{CfmvError, Dataset, Result, UndefinedPolicy};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::algorithms::cluster::Cluster;

/// Counters from one [`Imputer::fill`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillStats {
    /// Cells that received a cluster mean.
    pub cells_filled: usize,
    /// Cells left as NaN because their whole cluster lacked the feature.
    pub undefined_cells: usize,
    /// Clusters that had at least one missing feature.
    pub clusters_touched: usize,
}

/// A single pending write.
struct Fill {
    record: usize,
    feature: usize,
    value: f64,
}

/// Fills missing cells with the mean of the feature among cluster-mates that
/// have a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Imputer {
    policy: UndefinedPolicy,
}

impl Imputer {
    pub fn new(policy: UndefinedPolicy) -> Self {
        Self { policy }
    }

    /// Write the cluster means into `dataset`.
    ///
    /// `dataset` must be back in its raw scale. Every mean is computed before
    /// the first write, so an error leaves the dataset as it was.
    pub fn fill(&self, dataset: &mut Dataset, clusters: &[Cluster]) -> Result<FillStats> {
        if dataset.is_standardized() {
            return Err(CfmvError::InvalidArgument(
                "imputation needs a destandardized data set".to_string(),
            ));
        }

        let (fills, stats) = self.plan(dataset, clusters)?;
        for fill in fills {
            dataset.fill_missing(fill.record, fill.feature, fill.value)?;
        }

        info!(
            cells_filled = stats.cells_filled,
            undefined_cells = stats.undefined_cells,
            clusters = stats.clusters_touched,
            "missing values replaced"
        );
        Ok(stats)
    }

    fn plan(&self, dataset: &Dataset, clusters: &[Cluster]) -> Result<(Vec<Fill>, FillStats)> {
        let mut fills = Vec::new();
        let mut stats = FillStats::default();

        for (c, cluster) in clusters.iter().enumerate() {
            if let Some(&bad) = cluster.members().iter().find(|&&i| i >= dataset.len()) {
                return Err(CfmvError::InvalidArgument(format!(
                    "cluster {} refers to record {} but the data set has {} records",
                    c,
                    bad,
                    dataset.len()
                )));
            }
            if !cluster.has_missing_features() {
                continue;
            }
            stats.clusters_touched += 1;

            for &f in cluster.missing_features() {
                let mut sum = 0.0;
                let mut present = 0usize;
                let mut incomplete = Vec::new();
                for &i in cluster.members() {
                    let record = dataset.record(i);
                    if record.is_missing(f) {
                        incomplete.push(i);
                    } else {
                        sum += record.value(f);
                        present += 1;
                    }
                }

                if present == 0 {
                    match self.policy {
                        UndefinedPolicy::Fail => {
                            return Err(CfmvError::UndefinedImputation {
                                cluster: c,
                                feature: f,
                            });
                        }
                        UndefinedPolicy::Nan => {
                            warn!(
                                cluster = c,
                                feature = f,
                                cells = incomplete.len(),
                                "no value to average, writing NaN"
                            );
                            stats.undefined_cells += incomplete.len();
                            fills.extend(incomplete.into_iter().map(|record| Fill {
                                record,
                                feature: f,
                                value: f64::NAN,
                            }));
                            continue;
                        }
                    }
                }

                let value = dataset.feature_type(f).conform(sum / present as f64);
                debug!(
                    cluster = c,
                    feature = f,
                    value,
                    cells = incomplete.len(),
                    "cluster mean"
                );
                stats.cells_filled += incomplete.len();
                fills.extend(incomplete.into_iter().map(|record| Fill {
                    record,
                    feature: f,
                    value,
                }));
            }
        }

        Ok((fills, stats))
    }
}
