use std::collections::BTreeSet;

use cfmv_core::{Dataset, FeatureMask, Record};

/// A centroid plus the records currently assigned to it.
///
/// Members are indices into the [`Dataset`] the cluster was computed on; the
/// cluster never owns or copies records.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    centroid: Record,
    members: Vec<usize>,
    /// Union of the members' missing features.
    missing_features: BTreeSet<usize>,
    /// Set once the centroid stopped moving or the cluster came up empty.
    finished: bool,
}

impl Cluster {
    pub fn new(centroid: Record) -> Self {
        Self {
            centroid,
            members: Vec::new(),
            missing_features: BTreeSet::new(),
            finished: false,
        }
    }

    pub fn centroid(&self) -> &Record {
        &self.centroid
    }

    pub(crate) fn set_centroid(&mut self, centroid: Record) {
        self.centroid = centroid;
    }

    /// Record indices, in dataset order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn missing_features(&self) -> &BTreeSet<usize> {
        &self.missing_features
    }

    pub fn has_missing_features(&self) -> bool {
        !self.missing_features.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// Drop members and missing features ahead of a new assignment round.
    pub(crate) fn clear(&mut self) {
        self.members.clear();
        self.missing_features.clear();
    }

    pub(crate) fn add_member(&mut self, index: usize, record: &Record) {
        self.members.push(index);
        self.missing_features.extend(record.missing().iter().copied());
    }

    /// Sum of Euclidean distances from each member to the centroid, over the
    /// masked features.
    pub fn objective(&self, dataset: &Dataset, mask: &FeatureMask) -> f64 {
        self.members
            .iter()
            .map(|&i| {
                mask.squared_distance(dataset.record(i).values(), self.centroid.values())
                    .sqrt()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfmv_core::{Feature, FeatureSchema, FeatureType};

    fn dataset(rows: Vec<Vec<&str>>) -> Dataset {
        let n = rows[0].len();
        let schema = FeatureSchema::new(
            (0..n)
                .map(|i| Feature {
                    name: format!("f{}", i),
                    kind: FeatureType::Decimal,
                })
                .collect(),
        );
        Dataset::load(schema, rows).unwrap()
    }

    #[test]
    fn members_collect_missing_features() {
        let ds = dataset(vec![vec!["1.0", ""], vec!["2.0", "3.0"], vec!["", "1.0"]]);
        let mut cluster = Cluster::new(Record::new(vec![0.0, 0.0]));

        cluster.add_member(0, ds.record(0));
        cluster.add_member(1, ds.record(1));
        assert_eq!(cluster.members(), &[0, 1]);
        assert_eq!(cluster.missing_features(), &BTreeSet::from([1]));

        cluster.add_member(2, ds.record(2));
        assert_eq!(cluster.missing_features(), &BTreeSet::from([0, 1]));

        cluster.clear();
        assert!(cluster.is_empty());
        assert!(!cluster.has_missing_features());
        assert!(!cluster.is_finished());
    }

    #[test]
    fn objective_sums_member_distances() {
        let ds = dataset(vec![vec!["0.0", "7.0"], vec!["2.0", ""]]);
        let mask = ds.distance_mask();
        let mut cluster = Cluster::new(Record::new(vec![1.0, 0.0]));
        cluster.add_member(0, ds.record(0));
        cluster.add_member(1, ds.record(1));

        // Feature 1 is incomplete and does not count.
        assert!((cluster.objective(&ds, &mask) - 2.0).abs() < 1e-12);
    }
}
