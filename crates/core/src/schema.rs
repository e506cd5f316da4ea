use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CfmvError, Result};

/// Declared type of a feature, taken from the type row of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// Whole numbers (`i`).
    Integer,
    /// Real numbers (`d`).
    Decimal,
    /// Category codes starting from 0 (`c`).
    Categorical,
}

impl FeatureType {
    /// Tag used in the type row.
    pub fn tag(self) -> &'static str {
        match self {
            FeatureType::Integer => "i",
            FeatureType::Decimal => "d",
            FeatureType::Categorical => "c",
        }
    }

    /// Whether values of this type are stored and written as whole numbers.
    pub fn is_discrete(self) -> bool {
        matches!(self, FeatureType::Integer | FeatureType::Categorical)
    }

    /// Bring a computed value in line with the declared type.
    ///
    /// Discrete features round half-up (`floor(x + 0.5)`); decimals pass
    /// through untouched.
    pub fn conform(self, value: f64) -> f64 {
        if self.is_discrete() {
            (value + 0.5).floor()
        } else {
            value
        }
    }

    /// Render a value for export.
    ///
    /// Decimal output always carries a decimal point so a whole value reads
    /// back as `8.0`, not `8`. Non-finite values render blank.
    pub fn format(self, value: f64) -> String {
        if !value.is_finite() {
            return String::new();
        }
        if self.is_discrete() {
            format!("{}", self.conform(value) as i64)
        } else if value.fract() == 0.0 {
            format!("{:.1}", value)
        } else {
            format!("{}", value)
        }
    }

    /// Parse a non-blank cell for this type.
    pub(crate) fn parse_cell(self, raw: &str) -> Option<f64> {
        let value: f64 = raw.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        if self.is_discrete() && value.fract() != 0.0 {
            return None;
        }
        Some(value)
    }

    pub(crate) fn expected(self) -> &'static str {
        match self {
            FeatureType::Integer => "integer",
            FeatureType::Decimal => "decimal number",
            FeatureType::Categorical => "category code",
        }
    }
}

impl FromStr for FeatureType {
    type Err = CfmvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "i" => Ok(FeatureType::Integer),
            "d" => Ok(FeatureType::Decimal),
            "c" => Ok(FeatureType::Categorical),
            other => Err(CfmvError::Format(format!(
                "unknown feature type tag {:?} (expected i, d or c)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One column of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureType,
}

/// Column names and declared types, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<Feature>,
}

impl FeatureSchema {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Build a schema from the name row and the type row of a file.
    pub fn from_header<N, T>(names: &[N], tags: &[T]) -> Result<Self>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        if names.is_empty() {
            return Err(CfmvError::Format("header has no features".to_string()));
        }
        if names.len() != tags.len() {
            return Err(CfmvError::Format(format!(
                "header has {} names but {} type tags",
                names.len(),
                tags.len()
            )));
        }

        let features = names
            .iter()
            .zip(tags)
            .map(|(name, tag)| {
                Ok(Feature {
                    name: name.as_ref().trim().to_string(),
                    kind: tag.as_ref().parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature(&self, f: usize) -> &Feature {
        &self.features[f]
    }

    pub fn kind(&self, f: usize) -> FeatureType {
        self.features[f].kind
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.kind.tag()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_tags() {
        assert_eq!("i".parse::<FeatureType>().unwrap(), FeatureType::Integer);
        assert_eq!(" d ".parse::<FeatureType>().unwrap(), FeatureType::Decimal);
        assert_eq!("c".parse::<FeatureType>().unwrap(), FeatureType::Categorical);
        assert!(matches!("x".parse::<FeatureType>(), Err(CfmvError::Format(_))));
    }

    #[test]
    fn conform_rounds_discrete_half_up() {
        assert_eq!(FeatureType::Integer.conform(1.5), 2.0);
        assert_eq!(FeatureType::Integer.conform(1.49), 1.0);
        assert_eq!(FeatureType::Categorical.conform(-2.5), -2.0);
        assert_eq!(FeatureType::Decimal.conform(1.5), 1.5);
    }

    #[test]
    fn format_by_type() {
        assert_eq!(FeatureType::Integer.format(6.6), "7");
        assert_eq!(FeatureType::Categorical.format(2.0), "2");
        assert_eq!(FeatureType::Decimal.format(8.0), "8.0");
        assert_eq!(FeatureType::Decimal.format(1.25), "1.25");
        assert_eq!(FeatureType::Decimal.format(f64::NAN), "");
    }

    #[test]
    fn discrete_cells_must_be_whole() {
        assert_eq!(FeatureType::Integer.parse_cell("3"), Some(3.0));
        assert_eq!(FeatureType::Integer.parse_cell("3.0"), Some(3.0));
        assert_eq!(FeatureType::Integer.parse_cell("3.5"), None);
        assert_eq!(FeatureType::Decimal.parse_cell("3.5"), Some(3.5));
        assert_eq!(FeatureType::Decimal.parse_cell("NaN"), None);
        assert_eq!(FeatureType::Decimal.parse_cell("abc"), None);
    }

    #[test]
    fn header_lengths_must_match() {
        let err = FeatureSchema::from_header(&["a", "b"], &["i"]).unwrap_err();
        assert!(matches!(err, CfmvError::Format(_)));

        let empty: [&str; 0] = [];
        assert!(FeatureSchema::from_header(&empty, &empty).is_err());

        let schema = FeatureSchema::from_header(&["age", "income"], &["i", "d"]).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.names(), vec!["age", "income"]);
        assert_eq!(schema.tags(), vec!["i", "d"]);
        assert_eq!(schema.kind(1), FeatureType::Decimal);
    }
}
