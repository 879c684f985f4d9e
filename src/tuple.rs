//! Attribute-value pairs and the fixed-length sequences built from them.
//!
//! A [`Tuple`] stands for either one dataset record or one cluster centroid;
//! both sides of every distance computation go through the [`Item`] carried
//! at each position.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::dataset::Dataset;

/// One concrete cell value, tagged by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Continuous(f64),
    Discrete(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Continuous(v) => write!(f, "{}", v),
            Value::Discrete(s) => write!(f, "{}", s),
        }
    }
}

/// An (attribute, value) pair that knows how to measure distance against
/// another value of the same attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    attribute: Arc<Attribute>,
    value: Value,
}

impl Item {
    pub fn new(attribute: Arc<Attribute>, value: Value) -> Self {
        Self { attribute, value }
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Distance between this item's value and `other`.
    ///
    /// Continuous attributes compare min-max scaled values by absolute
    /// difference; discrete attributes yield 0 on equality and 1 otherwise.
    /// A kind mismatch never occurs for tuples drawn from one dataset and
    /// counts as fully distant.
    pub fn distance(&self, other: &Value) -> f64 {
        match (self.attribute.as_ref(), &self.value, other) {
            (Attribute::Continuous(attr), Value::Continuous(a), Value::Continuous(b)) => {
                (attr.scale(*a) - attr.scale(*b)).abs()
            }
            (Attribute::Discrete(_), Value::Discrete(a), Value::Discrete(b)) => {
                if a == b {
                    0.0
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }

    /// Replaces the value with the attribute's prototype over `members`.
    pub fn update(&mut self, data: &Dataset, members: &BTreeSet<usize>) {
        self.value = data.compute_prototype(members, &self.attribute);
    }
}

/// Ordered sequence of items, one per attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    items: Vec<Item>,
}

impl Tuple {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, i: usize) -> &Item {
        &self.items[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.iter_mut()
    }

    /// Sum of per-position item distances over the shorter of the two
    /// tuples. The lengths never differ for tuples of one dataset; the
    /// truncation only guards against mismatched inputs.
    pub fn distance(&self, other: &Tuple) -> f64 {
        let length = self.len().min(other.len());
        (0..length)
            .map(|i| self.items[i].distance(other.items[i].value()))
            .sum()
    }

    /// Mean distance between this tuple and the rows listed in `members`.
    pub fn average_distance(&self, data: &Dataset, members: &BTreeSet<usize>) -> f64 {
        let total: f64 = members
            .iter()
            .map(|&row| self.distance(&data.item_set(row)))
            .sum();
        total / members.len() as f64
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            write!(f, "{} ", item.value())?;
        }
        Ok(())
    }
}
