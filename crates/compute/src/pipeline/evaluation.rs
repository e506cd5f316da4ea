use cfmv_core::{CfmvError, Dataset, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Two values closer than this count as an exact hit.
const EXACT_EPSILON: f64 = 1e-9;

/// How close an imputed dataset came to the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Cells blank in the incomplete input.
    pub missing_cells: usize,
    /// Of those, cells whose imputed value equals the original.
    pub exact_hits: usize,
    /// `exact_hits / missing_cells`, as a percentage.
    pub hit_rate: f64,
    /// Mean of `|output - original| / (max - min) * 100` over the missing
    /// cells, with the range taken from the original feature.
    pub average_relative_error: f64,
}

/// Score `output` against `original` on the cells that are blank in
/// `incomplete`.
///
/// All three datasets must have the same shape and be in raw scale. A
/// feature whose original range is zero scores 0 for a hit and 100 for a
/// miss; an output cell that is itself blank counts as a miss with 100.
pub fn compare(original: &Dataset, incomplete: &Dataset, output: &Dataset) -> Result<Evaluation> {
    for (name, ds) in [("incomplete", incomplete), ("output", output)] {
        if ds.len() != original.len() || ds.feature_count() != original.feature_count() {
            return Err(CfmvError::Format(format!(
                "{} data set is {}x{}, original is {}x{}",
                name,
                ds.len(),
                ds.feature_count(),
                original.len(),
                original.feature_count()
            )));
        }
    }
    if [original, incomplete, output].iter().any(|ds| ds.is_standardized()) {
        return Err(CfmvError::InvalidArgument(
            "compare needs destandardized data sets".to_string(),
        ));
    }

    let ranges: Vec<f64> = (0..original.feature_count())
        .map(|f| {
            let (lo, hi) = original.feature_range(f);
            hi - lo
        })
        .collect();

    let mut missing_cells = 0usize;
    let mut exact_hits = 0usize;
    let mut total_error = 0.0;

    for (r, record) in incomplete.records().iter().enumerate() {
        for &f in record.missing() {
            missing_cells += 1;

            let truth = original.record(r).value(f);
            let out = output.record(r);
            let filled = out.value(f);
            let blank = out.is_missing(f) || !filled.is_finite();

            let diff = (filled - truth).abs();
            let hit = !blank && diff <= EXACT_EPSILON;
            let error = if blank || !diff.is_finite() {
                100.0
            } else if ranges[f] > 0.0 {
                diff / ranges[f] * 100.0
            } else if hit {
                0.0
            } else {
                100.0
            };

            if hit {
                exact_hits += 1;
            } else {
                debug!(
                    record = r,
                    feature = f,
                    original = truth,
                    output = filled,
                    relative_error = error,
                    "value differs"
                );
            }
            total_error += error;
        }
    }

    let evaluation = if missing_cells == 0 {
        Evaluation {
            missing_cells,
            exact_hits,
            hit_rate: 100.0,
            average_relative_error: 0.0,
        }
    } else {
        Evaluation {
            missing_cells,
            exact_hits,
            hit_rate: exact_hits as f64 / missing_cells as f64 * 100.0,
            average_relative_error: total_error / missing_cells as f64,
        }
    };

    info!(
        missing = evaluation.missing_cells,
        hits = evaluation.exact_hits,
        hit_rate = evaluation.hit_rate,
        average_relative_error = evaluation.average_relative_error,
        "comparison finished"
    );
    Ok(evaluation)
}
