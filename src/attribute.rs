//! Column descriptors for the two value domains the miner understands.
//!
//! A continuous column carries the observed [min, max] range and is compared
//! through min-max scaling; a discrete column carries its full, sorted set of
//! distinct values and is compared by equality.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::tuple::Value;

/// Numeric column with its observed domain.
///
/// # Example
/// ```
/// use kmeans_server::attribute::ContinuousAttribute;
///
/// let temperature = ContinuousAttribute::new("temperature", 0, 10.0, 30.0);
/// assert_eq!(temperature.scale(10.0), 0.0);
/// assert_eq!(temperature.scale(30.0), 1.0);
/// assert_eq!(temperature.scale(20.0), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousAttribute {
    name: String,
    index: usize,
    min: f64,
    max: f64,
}

impl ContinuousAttribute {
    pub fn new(name: &str, index: usize, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            index,
            min,
            max,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Maps `v` into [0,1] relative to the observed domain.
    ///
    /// Values outside [min, max] extrapolate below 0 or above 1; the domain
    /// is not clamped.
    pub fn scale(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }
}

/// Categorical column with a de-duplicated, lexicographically ordered domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteAttribute {
    name: String,
    index: usize,
    values: BTreeSet<String>,
}

impl DiscreteAttribute {
    pub fn new<I, S>(name: &str, index: usize, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            index,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn number_of_distinct_values(&self) -> usize {
        self.values.len()
    }

    /// Domain values in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.values.iter()
    }

    /// Counts how often `value` occurs in this attribute's column over the
    /// rows listed in `members`.
    pub fn frequency(&self, data: &Dataset, members: &BTreeSet<usize>, value: &str) -> usize {
        members
            .iter()
            .filter(|&&row| matches!(data.value(row, self.index), Value::Discrete(v) if v == value))
            .count()
    }
}

/// Schema entry for one column, either variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Continuous(ContinuousAttribute),
    Discrete(DiscreteAttribute),
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Continuous(a) => &a.name,
            Attribute::Discrete(a) => &a.name,
        }
    }

    /// Position of this column within a record, stable for the dataset's
    /// lifetime.
    pub fn index(&self) -> usize {
        match self {
            Attribute::Continuous(a) => a.index,
            Attribute::Discrete(a) => a.index,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn test_scale_endpoints() {
        let attr = ContinuousAttribute::new("outlook_strength", 0, 0.0, 10.0);
        assert_eq!(attr.scale(0.0), 0.0);
        assert_eq!(attr.scale(10.0), 1.0);
        assert_eq!(attr.scale(5.0), 0.5);
    }

    #[test]
    fn test_scale_extrapolates_outside_domain() {
        let attr = ContinuousAttribute::new("temperature", 0, 0.0, 10.0);
        assert_eq!(attr.scale(15.0), 1.5);
        assert_eq!(attr.scale(-5.0), -0.5);
    }

    #[test]
    fn test_discrete_domain_is_sorted_and_deduplicated() {
        let attr = DiscreteAttribute::new("wind", 0, ["strong", "weak", "strong"]);
        assert_eq!(attr.number_of_distinct_values(), 2);
        let domain: Vec<&String> = attr.iter().collect();
        assert_eq!(domain, ["strong", "weak"]);
    }

    #[test]
    fn test_frequency_counts_only_the_own_column() {
        // Two discrete columns share the same vocabulary; "a" occurrences in
        // the second column must not leak into the first column's count.
        let attributes = vec![
            Attribute::Discrete(DiscreteAttribute::new("first", 0, ["a", "b"])),
            Attribute::Discrete(DiscreteAttribute::new("second", 1, ["a", "b"])),
        ];
        let records = vec![
            vec![Value::Discrete("a".into()), Value::Discrete("a".into())],
            vec![Value::Discrete("a".into()), Value::Discrete("b".into())],
            vec![Value::Discrete("b".into()), Value::Discrete("a".into())],
        ];
        let data = Dataset::new(attributes, records).unwrap();
        let members: BTreeSet<usize> = [0, 1, 2].into_iter().collect();

        let first = match data.attribute(0) {
            Attribute::Discrete(a) => a.clone(),
            _ => unreachable!(),
        };
        assert_eq!(first.frequency(&data, &members, "a"), 2);
        assert_eq!(first.frequency(&data, &members, "b"), 1);
    }

    #[test]
    fn test_frequency_respects_the_member_subset() {
        let attributes = vec![Attribute::Discrete(DiscreteAttribute::new(
            "play",
            0,
            ["no", "yes"],
        ))];
        let records = vec![
            vec![Value::Discrete("yes".into())],
            vec![Value::Discrete("no".into())],
            vec![Value::Discrete("yes".into())],
        ];
        let data = Dataset::new(attributes, records).unwrap();
        let members: BTreeSet<usize> = [1, 2].into_iter().collect();

        let play = match data.attribute(0) {
            Attribute::Discrete(a) => a.clone(),
            _ => unreachable!(),
        };
        assert_eq!(play.frequency(&data, &members, "yes"), 1);
        assert_eq!(play.frequency(&data, &members, "no"), 1);
    }
}
