//! In-memory table of distinct records plus the attribute schema that
//! describes its columns.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::attribute::{Attribute, ContinuousAttribute, DiscreteAttribute};
use crate::database::{ColumnDomain, TableSnapshot};
use crate::error::{DatasetError, OutOfRangeSampleSize};
use crate::tuple::{Item, Tuple, Value};

/// A validated, duplicate-free collection of records.
///
/// Every record has exactly one value per attribute, with the value kind
/// matching the attribute kind. Duplicate records are collapsed on
/// construction, keeping the first occurrence, so row indices always name
/// value-distinct records.
#[derive(Debug, Clone)]
pub struct Dataset {
    attributes: Vec<Arc<Attribute>>,
    records: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(attributes: Vec<Attribute>, records: Vec<Vec<Value>>) -> Result<Self, DatasetError> {
        let attributes: Vec<Arc<Attribute>> = attributes.into_iter().map(Arc::new).collect();
        let mut distinct: Vec<Vec<Value>> = Vec::with_capacity(records.len());
        for (row, record) in records.into_iter().enumerate() {
            if record.len() != attributes.len() {
                return Err(DatasetError::WidthMismatch {
                    row,
                    expected: attributes.len(),
                    found: record.len(),
                });
            }
            for (column, value) in record.iter().enumerate() {
                let compatible = matches!(
                    (attributes[column].as_ref(), value),
                    (Attribute::Continuous(_), Value::Continuous(_))
                        | (Attribute::Discrete(_), Value::Discrete(_))
                );
                if !compatible {
                    return Err(DatasetError::KindMismatch { row, column });
                }
            }
            if !distinct.contains(&record) {
                distinct.push(record);
            }
        }
        Ok(Self {
            attributes,
            records: distinct,
        })
    }

    /// Builds a dataset from a fetched table snapshot, deriving one
    /// attribute per column from its domain.
    pub fn from_snapshot(snapshot: TableSnapshot) -> Result<Self, DatasetError> {
        let attributes = snapshot
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| match &column.domain {
                ColumnDomain::Numeric { min, max } => Attribute::Continuous(
                    ContinuousAttribute::new(&column.name, index, *min, *max),
                ),
                ColumnDomain::Categorical { values } => Attribute::Discrete(
                    DiscreteAttribute::new(&column.name, index, values.iter().cloned()),
                ),
            })
            .collect();
        Self::new(attributes, snapshot.rows)
    }

    pub fn number_of_examples(&self) -> usize {
        self.records.len()
    }

    pub fn number_of_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute(&self, index: usize) -> &Attribute {
        self.attributes[index].as_ref()
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.records[row][column]
    }

    /// Materializes row `row` as a tuple of items sharing this dataset's
    /// attribute handles.
    pub fn item_set(&self, row: usize) -> Tuple {
        let items = self
            .attributes
            .iter()
            .enumerate()
            .map(|(column, attribute)| {
                Item::new(Arc::clone(attribute), self.records[row][column].clone())
            })
            .collect();
        Tuple::new(items)
    }

    /// Prototype value of `attribute` over the rows in `members`: the mean
    /// for continuous attributes, the mode for discrete ones.
    pub fn compute_prototype(&self, members: &BTreeSet<usize>, attribute: &Attribute) -> Value {
        match attribute {
            Attribute::Continuous(attr) => {
                Value::Continuous(self.continuous_prototype(members, attr))
            }
            Attribute::Discrete(attr) => Value::Discrete(self.discrete_prototype(members, attr)),
        }
    }

    fn continuous_prototype(&self, members: &BTreeSet<usize>, attribute: &ContinuousAttribute) -> f64 {
        let mut total = 0.0;
        for &row in members {
            if let Value::Continuous(v) = self.value(row, attribute.index()) {
                total += v;
            }
        }
        total / members.len() as f64
    }

    /// Mode over the attribute domain. Ties keep the lexicographically
    /// first value since later candidates must be strictly more frequent
    /// to replace the current best.
    fn discrete_prototype(&self, members: &BTreeSet<usize>, attribute: &DiscreteAttribute) -> String {
        let mut best: Option<(&String, usize)> = None;
        for candidate in attribute.iter() {
            let count = attribute.frequency(self, members, candidate);
            match best {
                Some((_, top)) if count <= top => {}
                _ => best = Some((candidate, count)),
            }
        }
        best.map(|(value, _)| value.clone()).unwrap_or_default()
    }

    /// Picks `k` pairwise value-distinct row indices at random, seeding
    /// from the current wall clock.
    pub fn sample(&self, k: usize) -> Result<Vec<usize>, OutOfRangeSampleSize> {
        let seed = Utc::now().timestamp_millis() as u64;
        self.sample_with(k, &mut StdRng::seed_from_u64(seed))
    }

    /// Sampling with a caller-supplied generator. Rejected candidates are
    /// redrawn until `k` distinct rows are found; records are duplicate
    /// free, so a rejection only ever means the index is already chosen.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        k: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, OutOfRangeSampleSize> {
        if k == 0 || k > self.number_of_examples() {
            return Err(OutOfRangeSampleSize {
                requested: k,
                available: self.number_of_examples(),
            });
        }
        let mut chosen: Vec<usize> = Vec::with_capacity(k);
        while chosen.len() < k {
            let candidate = rng.random_range(0..self.number_of_examples());
            if chosen
                .iter()
                .any(|&picked| self.records[picked] == self.records[candidate])
            {
                continue;
            }
            chosen.push(candidate);
        }
        Ok(chosen)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attribute in &self.attributes {
            write!(f, "{}  ", attribute)?;
        }
        for record in &self.records {
            writeln!(f)?;
            for value in record {
                write!(f, "{}  ", value)?;
            }
        }
        Ok(())
    }
}
