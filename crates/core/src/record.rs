use std::collections::BTreeSet;

/// One row of the dataset: a fixed-length feature vector plus the indices of
/// the features that have no value.
///
/// Missing cells hold a `0.0` placeholder until they are imputed; a cell
/// leaves the `missing` set once it holds a finite value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<f64>,
    missing: BTreeSet<usize>,
}

impl Record {
    /// A complete record (centroids are built this way).
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            missing: BTreeSet::new(),
        }
    }

    pub fn with_missing(values: Vec<f64>, missing: BTreeSet<usize>) -> Self {
        debug_assert!(missing.iter().all(|&f| f < values.len()));
        Self { values, missing }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, f: usize) -> f64 {
        self.values[f]
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Store an imputed value. NaN keeps the cell marked missing.
    pub(crate) fn fill(&mut self, f: usize, value: f64) {
        self.values[f] = value;
        if value.is_finite() {
            self.missing.remove(&f);
        }
    }

    pub fn missing(&self) -> &BTreeSet<usize> {
        &self.missing
    }

    pub fn is_missing(&self, f: usize) -> bool {
        self.missing.contains(&f)
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.values)?;
        if !self.missing.is_empty() {
            write!(f, " missing={:?}", self.missing)?;
        }
        Ok(())
    }
}

/// Features that take part in distance and centroid math.
///
/// A feature is inactive when any record in the dataset is missing it. The
/// mask is computed once at load time and handed out by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMask {
    active: Vec<bool>,
}

impl FeatureMask {
    /// Build from the dataset-wide "has any missing" flags.
    pub fn from_missing_flags(feature_has_missing: &[bool]) -> Self {
        Self {
            active: feature_has_missing.iter().map(|&m| !m).collect(),
        }
    }

    pub fn is_active(&self, f: usize) -> bool {
        self.active[f]
    }

    /// Indices of the active features, ascending.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(f, &on)| on.then_some(f))
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&on| on).count()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Squared Euclidean distance over the active features.
    #[inline]
    pub fn squared_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .zip(&self.active)
            .filter(|&(_, &on)| on)
            .map(|((x, y), _)| {
                let d = x - y;
                d * d
            })
            .sum()
    }
}
