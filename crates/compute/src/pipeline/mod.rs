//! Imputation pipeline.
//!
//! Wires the stages together over a single owned [`Dataset`]:
//!
//! - **standardize** the raw values so every feature weighs the same,
//! - **cluster** with [`ClusterEngine`],
//! - **destandardize** back to the raw scale,
//! - **fill** each missing cell with its cluster's mean via [`Imputer`].

pub mod evaluation;
pub mod imputer;


use std::time::Instant;

use cfmv_core::{CfmvError, Config, Dataset, Result};
use serde::Serialize;
use tracing::info;

use crate::algorithms::kmeans::{validate_k, ClusterEngine};

use self::imputer::Imputer;

/// Summary of one [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputeReport {
    pub k: usize,
    /// Assign/recompute rounds the clustering took.
    pub iterations: usize,
    /// False when clustering stopped at the iteration cap.
    pub converged: bool,
    /// Member count per cluster, in seed order.
    pub cluster_sizes: Vec<usize>,
    /// Features left out of distance math because some record lacks them.
    pub incomplete_features: Vec<usize>,
    /// Missing cells before imputation.
    pub missing_cells: usize,
    pub cells_filled: usize,
    /// Cells set to NaN because their whole cluster lacked the feature.
    pub undefined_cells: usize,
    pub elapsed_ms: u64,
}

/// Standardize → cluster → destandardize → fill.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    engine: ClusterEngine,
    imputer: Imputer,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            engine: ClusterEngine::new(config.engine.clone()),
            imputer: Imputer::new(config.imputation.undefined_policy),
        }
    }

    /// Fill the missing cells of `dataset` in place.
    ///
    /// Preconditions (`1 <= k <= records`, raw scale, valid engine config)
    /// are checked before anything is touched. If clustering fails the
    /// dataset is put back into its raw scale before the error is returned.
    pub fn run(&self, dataset: &mut Dataset, k: usize) -> Result<ImputeReport> {
        validate_k(dataset, k)?;
        self.engine.config().validate()?;
        if dataset.is_standardized() {
            return Err(CfmvError::InvalidArgument(
                "imputation expects a data set in its raw scale".to_string(),
            ));
        }

        let start = Instant::now();
        let missing_cells = dataset.missing_count();
        let incomplete_features = dataset.incomplete_features();
        info!(
            k,
            records = dataset.len(),
            missing_cells,
            ?incomplete_features,
            "imputation started"
        );

        dataset.standardize();
        let run = self.engine.run(dataset, k);
        dataset.destandardize();
        let run = run?;

        let stats = self.imputer.fill(dataset, &run.clusters)?;

        let report = ImputeReport {
            k,
            iterations: run.iterations,
            converged: run.converged,
            cluster_sizes: run.sizes(),
            incomplete_features,
            missing_cells,
            cells_filled: stats.cells_filled,
            undefined_cells: stats.undefined_cells,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            cells_filled = report.cells_filled,
            converged = report.converged,
            elapsed_ms = report.elapsed_ms,
            "imputation finished"
        );
        Ok(report)
    }
}

/// Impute `dataset` in place with `k` clusters.
pub fn impute(dataset: &mut Dataset, k: usize, config: &Config) -> Result<ImputeReport> {
    Pipeline::new(config).run(dataset, k)
}
