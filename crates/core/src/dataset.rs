use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::{CfmvError, Result};
use crate::record::{FeatureMask, Record};
use crate::schema::{FeatureSchema, FeatureType};

/// Decimal places kept by [`Dataset::destandardize`].
const DESTANDARDIZE_DECIMALS: i32 = 6;

/// 2^52.
const MAX_EXACT_FRACTION: f64 = 4_503_599_627_370_496.0;

/// All records of a table plus the per-feature statistics used to scale them.
///
/// Statistics are computed once, from the raw values, at load time. Missing
/// cells hold a `0.0` placeholder: it adds nothing to the mean's sum but the
/// denominator is still the total record count (population statistics over
/// `N` rows, not over the present cells).
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: FeatureSchema,
    records: Vec<Record>,
    mean: Vec<f64>,
    std_dev: Vec<f64>,
    feature_has_missing: Vec<bool>,
    standardized: bool,
}

impl Dataset {
    /// Build a dataset from already split rows.
    ///
    /// A cell that is empty after trimming is missing. Every row must have as
    /// many cells as the schema has features.
    pub fn load<I, R, S>(schema: FeatureSchema, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        if schema.is_empty() {
            return Err(CfmvError::Format("header has no features".to_string()));
        }

        let n_features = schema.len();
        let mut records = Vec::new();
        let mut feature_has_missing = vec![false; n_features];
        let mut missing_cells = 0usize;

        for (row_idx, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_features {
                return Err(CfmvError::Format(format!(
                    "record {} has {} fields, header has {}",
                    row_idx,
                    row.len(),
                    n_features
                )));
            }

            let mut values = Vec::with_capacity(n_features);
            let mut missing = BTreeSet::new();

            for (f, cell) in row.iter().enumerate() {
                let raw = cell.as_ref().trim();
                if raw.is_empty() {
                    values.push(0.0);
                    missing.insert(f);
                    feature_has_missing[f] = true;
                    missing_cells += 1;
                    continue;
                }

                let kind = schema.kind(f);
                let value = kind.parse_cell(raw).ok_or_else(|| CfmvError::Parse {
                    row: row_idx,
                    column: f,
                    value: raw.to_string(),
                    expected: kind.expected(),
                })?;
                values.push(value);
            }

            records.push(Record::with_missing(values, missing));
        }

        if records.is_empty() {
            return Err(CfmvError::InvalidArgument(
                "data set has no records".to_string(),
            ));
        }

        let (mean, std_dev) = population_stats(&records, n_features);

        info!(
            records = records.len(),
            features = n_features,
            missing_cells,
            "data set loaded"
        );
        debug!(?mean, ?std_dev, ?feature_has_missing, "feature statistics");

        Ok(Self {
            schema,
            records,
            mean,
            std_dev,
            feature_has_missing,
            standardized: false,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, index: usize) -> &Record {
        &self.records[index]
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std_dev(&self) -> &[f64] {
        &self.std_dev
    }

    pub fn feature_type(&self, f: usize) -> FeatureType {
        self.schema.kind(f)
    }

    /// True if any record is missing feature `f`.
    pub fn has_missing(&self, f: usize) -> bool {
        self.feature_has_missing[f]
    }

    /// Features with at least one missing cell, ascending.
    pub fn incomplete_features(&self) -> Vec<usize> {
        (0..self.feature_count())
            .filter(|&f| self.feature_has_missing[f])
            .collect()
    }

    /// Number of cells currently without a value.
    pub fn missing_count(&self) -> usize {
        self.records.iter().map(|r| r.missing().len()).sum()
    }

    /// Mask of features usable for distance math.
    pub fn distance_mask(&self) -> FeatureMask {
        FeatureMask::from_missing_flags(&self.feature_has_missing)
    }

    pub fn is_standardized(&self) -> bool {
        self.standardized
    }

    /// Observed `(min, max)` of feature `f` over every record, in the
    /// dataset's current scale.
    pub fn feature_range(&self, f: usize) -> (f64, f64) {
        self.records
            .iter()
            .map(|r| r.value(f))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Scale every feature to zero mean and unit variance.
    ///
    /// Placeholders of missing cells are transformed too; they sit on
    /// features excluded from distance math, so their value is inert.
    pub fn standardize(&mut self) {
        if self.standardized {
            warn!("data set is already standardized, skipping");
            return;
        }

        let scales = self.scales();
        for record in &mut self.records {
            for ((v, m), s) in record.values_mut().iter_mut().zip(&self.mean).zip(&scales) {
                *v = (*v - m) / s;
            }
        }
        self.standardized = true;

        info!(records = self.records.len(), "points standardized");
    }

    /// Undo [`standardize`](Self::standardize), rounding every value to six
    /// decimals (half-down) to drop floating-point noise from the round trip.
    pub fn destandardize(&mut self) {
        if !self.standardized {
            warn!("data set is not standardized, skipping");
            return;
        }

        let scales = self.scales();
        for record in &mut self.records {
            for ((v, m), s) in record.values_mut().iter_mut().zip(&self.mean).zip(&scales) {
                *v = round_half_down(m + *v * s, DESTANDARDIZE_DECIMALS);
            }
        }
        self.standardized = false;

        info!(records = self.records.len(), "points destandardized");
    }

    /// Write an imputed value into a cell that is still missing.
    ///
    /// Observed cells are never overwritten. A finite value clears the
    /// cell's missing flag; the dataset-wide flags from load time stay as
    /// they are.
    pub fn fill_missing(&mut self, record: usize, feature: usize, value: f64) -> Result<()> {
        if self.standardized {
            return Err(CfmvError::InvalidArgument(
                "cannot fill a standardized data set".to_string(),
            ));
        }
        let n_features = self.feature_count();
        let target = self.records.get_mut(record).ok_or_else(|| {
            CfmvError::InvalidArgument(format!("record {} out of range", record))
        })?;
        if feature >= n_features {
            return Err(CfmvError::InvalidArgument(format!(
                "feature {} out of range",
                feature
            )));
        }
        if !target.is_missing(feature) {
            return Err(CfmvError::InvalidArgument(format!(
                "record {} feature {} is not missing",
                record, feature
            )));
        }
        target.fill(feature, value);
        Ok(())
    }

    /// Divisor per feature; a zero deviation scales by 1 so the transform
    /// stays finite and invertible.
    fn scales(&self) -> Vec<f64> {
        self.std_dev
            .iter()
            .map(|&s| if s > 0.0 && s.is_finite() { s } else { 1.0 })
            .collect()
    }
}

/// Population mean and standard deviation per feature over all records.
fn population_stats(records: &[Record], n_features: usize) -> (Vec<f64>, Vec<f64>) {
    let n = records.len() as f64;

    let mut sum = vec![0.0; n_features];
    for record in records {
        for (f, (acc, &v)) in sum.iter_mut().zip(record.values()).enumerate() {
            if !record.is_missing(f) {
                *acc += v;
            }
        }
    }
    let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();

    // Deviations are divided by the largest one before squaring so values
    // near f64::MAX do not overflow the sum.
    let mut largest = vec![0.0f64; n_features];
    for record in records {
        for ((acc, &v), m) in largest.iter_mut().zip(record.values()).zip(&mean) {
            *acc = acc.max((v - m).abs());
        }
    }

    let mut sq = vec![0.0; n_features];
    for record in records {
        let terms = sq.iter_mut().zip(record.values()).zip(&mean).zip(&largest);
        for (((acc, &v), m), &l) in terms {
            if l > 0.0 {
                let d = (v - m) / l;
                *acc += d * d;
            }
        }
    }
    let std_dev = sq
        .iter()
        .zip(&largest)
        .map(|(s, l)| l * (s / n).sqrt())
        .collect();

    (mean, std_dev)
}

/// Round to `decimals` places; exact ties go toward zero.
pub fn round_half_down(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    let scaled = value.abs() * factor;
    // Past 2^52 every f64 is already a whole number at this precision.
    if scaled >= MAX_EXACT_FRACTION {
        return value;
    }
    let floor = scaled.floor();
    let rounded = if scaled - floor > 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 {
        return 0.0;
    }
    (rounded / factor).copysign(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Feature;

    fn schema(kinds: &[FeatureType]) -> FeatureSchema {
        FeatureSchema::new(
            kinds
                .iter()
                .enumerate()
                .map(|(i, &kind)| Feature {
                    name: format!("f{}", i),
                    kind,
                })
                .collect(),
        )
    }

    fn decimals(n: usize) -> FeatureSchema {
        schema(&vec![FeatureType::Decimal; n])
    }

    #[test]
    fn load_flags_missing_cells() {
        let ds = Dataset::load(
            decimals(2),
            vec![vec!["1.0", "5.0"], vec!["2.0", " "], vec!["3.0", "7.0"]],
        )
        .unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.feature_count(), 2);
        assert!(!ds.has_missing(0));
        assert!(ds.has_missing(1));
        assert!(ds.record(1).is_missing(1));
        assert_eq!(ds.record(1).value(1), 0.0);
        assert_eq!(ds.missing_count(), 1);
        assert_eq!(ds.incomplete_features(), vec![1]);
        assert!(!ds.distance_mask().is_active(1));
    }

    #[test]
    fn statistics_divide_by_total_records() {
        let ds = Dataset::load(
            decimals(2),
            vec![vec!["1.0", "4.0"], vec!["3.0", ""], vec!["5.0", "2.0"]],
        )
        .unwrap();

        assert!((ds.mean()[0] - 3.0).abs() < 1e-12);
        // (4 + 2) / 3, the blank cell still counts as a record.
        assert!((ds.mean()[1] - 2.0).abs() < 1e-12);

        let expected0 = (8.0f64 / 3.0).sqrt();
        assert!((ds.std_dev()[0] - expected0).abs() < 1e-12);
        // Placeholder 0 takes part in the variance sum: (4+4+0)/3.
        let expected1 = (8.0f64 / 3.0).sqrt();
        assert!((ds.std_dev()[1] - expected1).abs() < 1e-12);
    }

    #[test]
    fn row_length_mismatch_is_format_error() {
        let err = Dataset::load(decimals(2), vec![vec!["1.0", "2.0"], vec!["1.0"]]).unwrap_err();
        assert!(matches!(err, CfmvError::Format(_)));
    }

    #[test]
    fn bad_cell_is_parse_error() {
        let err = Dataset::load(
            schema(&[FeatureType::Decimal, FeatureType::Integer]),
            vec![vec!["1.0", "2"], vec!["1.5", "2.5"]],
        )
        .unwrap_err();
        match err {
            CfmvError::Parse { row, column, value, .. } => {
                assert_eq!((row, column), (1, 1));
                assert_eq!(value, "2.5");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = Dataset::load(decimals(1), vec![vec!["abc"]]).unwrap_err();
        assert!(matches!(err, CfmvError::Parse { .. }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let rows: Vec<Vec<&str>> = Vec::new();
        let err = Dataset::load(decimals(2), rows).unwrap_err();
        assert!(matches!(err, CfmvError::InvalidArgument(_)));

        let rows = vec![Vec::<&str>::new()];
        let err = Dataset::load(FeatureSchema::default(), rows).unwrap_err();
        assert!(matches!(err, CfmvError::Format(_)));
    }

    #[test]
    fn standardize_round_trip() {
        let rows = vec![
            vec!["1.5", "-20.0", "3"],
            vec!["2.25", "10.0", "7"],
            vec!["9.125", "0.5", "1"],
            vec!["4.0", "33.3", "0"],
        ];
        let original = Dataset::load(
            schema(&[FeatureType::Decimal, FeatureType::Decimal, FeatureType::Integer]),
            rows,
        )
        .unwrap();
        let mut ds = original.clone();

        ds.standardize();
        assert!(ds.is_standardized());
        for f in 0..ds.feature_count() {
            let mean: f64 = ds.records().iter().map(|r| r.value(f)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-9, "feature {f} mean {mean}");
        }

        ds.destandardize();
        assert!(!ds.is_standardized());
        for (a, b) in original.records().iter().zip(ds.records()) {
            for (x, y) in a.values().iter().zip(b.values()) {
                assert!((x - y).abs() < 1e-5, "{x} != {y}");
            }
        }
    }

    #[test]
    fn constant_feature_survives_round_trip() {
        let mut ds =
            Dataset::load(decimals(2), vec![vec!["4.0", "1.0"], vec!["4.0", "2.0"]]).unwrap();
        assert_eq!(ds.std_dev()[0], 0.0);

        ds.standardize();
        assert_eq!(ds.record(0).value(0), 0.0);
        ds.destandardize();
        assert_eq!(ds.record(0).value(0), 4.0);
        assert_eq!(ds.record(1).value(0), 4.0);
    }

    #[test]
    fn placeholder_returns_to_zero() {
        let mut ds = Dataset::load(decimals(1), vec![vec!["3.0"], vec![""], vec!["6.0"]]).unwrap();
        ds.standardize();
        ds.destandardize();
        assert_eq!(ds.record(1).value(0), 0.0);
    }

    #[test]
    fn repeated_transforms_are_ignored() {
        let mut ds = Dataset::load(decimals(1), vec![vec!["1.0"], vec!["3.0"]]).unwrap();
        ds.destandardize();
        assert_eq!(ds.record(0).value(0), 1.0);

        ds.standardize();
        ds.standardize();
        assert!((ds.record(0).value(0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn fill_missing_only_touches_blank_cells() {
        let mut ds = Dataset::load(decimals(2), vec![vec!["1.0", ""], vec!["2.0", "3.0"]]).unwrap();

        ds.fill_missing(0, 1, f64::NAN).unwrap();
        assert!(ds.record(0).is_missing(1));
        ds.fill_missing(0, 1, 3.0).unwrap();
        assert_eq!(ds.record(0).value(1), 3.0);
        assert!(!ds.record(0).is_missing(1));
        assert_eq!(ds.missing_count(), 0);
        assert!(ds.has_missing(1));
        assert!(ds.fill_missing(0, 1, 4.0).is_err());

        assert!(matches!(ds.fill_missing(1, 1, 9.0), Err(CfmvError::InvalidArgument(_))));
        assert!(matches!(ds.fill_missing(5, 0, 9.0), Err(CfmvError::InvalidArgument(_))));
        assert!(matches!(ds.fill_missing(0, 7, 9.0), Err(CfmvError::InvalidArgument(_))));
        assert_eq!(ds.record(1).value(1), 3.0);

        ds.standardize();
        assert!(ds.fill_missing(0, 1, 1.0).is_err());
    }

    #[test]
    fn feature_range_spans_all_records() {
        let ds = Dataset::load(decimals(1), vec![vec!["3.0"], vec!["-1.0"], vec!["8.5"]]).unwrap();
        assert_eq!(ds.feature_range(0), (-1.0, 8.5));
    }

    #[test]
    fn huge_values_survive_the_round_trip() {
        let mut ds = Dataset::load(decimals(1), vec![vec!["1e303"], vec!["2e303"]]).unwrap();
        assert!(ds.std_dev()[0].is_finite());
        assert!((ds.std_dev()[0] / 5e302 - 1.0).abs() < 1e-12);

        ds.standardize();
        ds.destandardize();
        for (r, expected) in [1e303, 2e303].iter().enumerate() {
            let v = ds.record(r).value(0);
            assert!(v.is_finite(), "record {r} became {v}");
            assert!((v / expected - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn round_half_down_breaks_ties_toward_zero() {
        assert_eq!(round_half_down(2.5, 0), 2.0);
        assert_eq!(round_half_down(2.6, 0), 3.0);
        assert_eq!(round_half_down(-2.5, 0), -2.0);
        assert_eq!(round_half_down(-2.6, 0), -3.0);
        assert_eq!(round_half_down(0.999_999_999_8, 6), 1.0);
        assert_eq!(round_half_down(1.234_567_4, 6), 1.234_567);
        assert_eq!(round_half_down(-0.000_000_01, 6), 0.0);
        assert!(round_half_down(f64::NAN, 6).is_nan());
        assert_eq!(round_half_down(1e303, 6), 1e303);
        assert_eq!(round_half_down(-4.5e15, 6), -4.5e15);
    }
}
