//! Clusters and the fixed-size collection the mining engine refines.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::OutOfRangeSampleSize;
use crate::tuple::Tuple;

/// One centroid plus the set of row indices currently assigned to it.
///
/// The centroid tuple is created once at seeding and mutated in place on
/// every refinement pass; membership is mutated by the engine as rows move
/// between clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    centroid: Tuple,
    members: BTreeSet<usize>,
}

impl Cluster {
    fn new(centroid: Tuple) -> Self {
        Self {
            centroid,
            members: BTreeSet::new(),
        }
    }

    pub fn centroid(&self) -> &Tuple {
        &self.centroid
    }

    pub fn members(&self) -> &BTreeSet<usize> {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.members.contains(&row)
    }

    /// Returns true when `row` was not already a member.
    pub(crate) fn add(&mut self, row: usize) -> bool {
        self.members.insert(row)
    }

    pub(crate) fn remove(&mut self, row: usize) -> bool {
        self.members.remove(&row)
    }

    /// Recomputes every centroid item as the prototype of the current
    /// membership. An empty membership yields NaN means for continuous
    /// attributes, which is reported by the engine rather than patched here.
    pub(crate) fn compute_centroid(&mut self, data: &Dataset) {
        let members = &self.members;
        for item in self.centroid.iter_mut() {
            item.update(data, members);
        }
    }

    /// Renders the centroid, every member row with its distance from the
    /// centroid, and the average member distance.
    pub fn summary_with(&self, data: &Dataset) -> String {
        let mut out = format!("Centroid=({})\nExamples:\n", self.centroid);
        for &row in &self.members {
            out.push('[');
            for column in 0..data.number_of_attributes() {
                out.push_str(&format!("{} ", data.value(row, column)));
            }
            let distance = self.centroid.distance(&data.item_set(row));
            out.push_str(&format!("] dist = {:.4}\n", distance));
        }
        out.push_str(&format!(
            "AvgDistance={:.4}\n",
            self.centroid.average_distance(data, &self.members)
        ));
        out
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Centroid=({})", self.centroid)
    }
}

/// Ordered collection of exactly `k` clusters, `k` fixed at seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
}

impl ClusterSet {
    /// Seeds one cluster per sampled row, using the row's materialized
    /// tuple as the initial centroid and an empty membership.
    pub(crate) fn initialize(data: &Dataset, k: usize) -> Result<Self, OutOfRangeSampleSize> {
        let seeds = data.sample(k)?;
        let clusters = seeds
            .into_iter()
            .map(|row| Cluster::new(data.item_set(row)))
            .collect();
        Ok(Self { clusters })
    }

    #[cfg(test)]
    pub(crate) fn from_centroids(centroids: Vec<Tuple>) -> Self {
        Self {
            clusters: centroids.into_iter().map(Cluster::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, index: usize) -> &Cluster {
        &self.clusters[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Cluster {
        &mut self.clusters[index]
    }

    /// Index of the cluster whose centroid is nearest to `tuple`. Scans in
    /// cluster order and keeps the first cluster on exact ties.
    pub(crate) fn nearest_cluster(&self, tuple: &Tuple) -> usize {
        let mut index = 0;
        let mut best = tuple.distance(self.clusters[0].centroid());
        for (j, cluster) in self.clusters.iter().enumerate().skip(1) {
            let distance = tuple.distance(cluster.centroid());
            if distance < best {
                best = distance;
                index = j;
            }
        }
        index
    }

    /// Index of the cluster currently holding `row`, if any. At most one
    /// cluster may hold a row; the scan returns the first match.
    pub(crate) fn current_cluster(&self, row: usize) -> Option<usize> {
        self.clusters.iter().position(|cluster| cluster.contains(row))
    }

    pub(crate) fn update_centroids(&mut self, data: &Dataset) {
        for cluster in &mut self.clusters {
            cluster.compute_centroid(data);
        }
    }

    /// Indices of clusters that converged to an empty membership.
    pub fn degenerate_clusters(&self) -> Vec<usize> {
        self.clusters
            .iter()
            .enumerate()
            .filter(|(_, cluster)| cluster.is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    /// Full cluster-and-membership report, one numbered block per cluster.
    pub fn summary_with(&self, data: &Dataset) -> String {
        let mut out = String::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            out.push_str(&format!("{}:{}\n", index + 1, cluster.summary_with(data)));
        }
        out
    }
}

impl fmt::Display for ClusterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, cluster) in self.clusters.iter().enumerate() {
            writeln!(f, "{}:{}", index + 1, cluster)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, ContinuousAttribute, DiscreteAttribute};
    use crate::tuple::Value;

    fn toy() -> Dataset {
        let attributes = vec![
            Attribute::Continuous(ContinuousAttribute::new("level", 0, 0.0, 10.0)),
            Attribute::Discrete(DiscreteAttribute::new("tag", 1, ["x", "y"])),
        ];
        let records = vec![
            vec![Value::Continuous(5.0), Value::Discrete("x".into())],
            vec![Value::Continuous(10.0), Value::Discrete("y".into())],
            vec![Value::Continuous(0.0), Value::Discrete("x".into())],
        ];
        Dataset::new(attributes, records).unwrap()
    }

    #[test]
    fn test_nearest_cluster_keeps_the_first_on_ties() {
        let data = toy();
        let set = ClusterSet::from_centroids(vec![data.item_set(0), data.item_set(0)]);
        assert_eq!(set.nearest_cluster(&data.item_set(1)), 0);
    }

    #[test]
    fn test_nearest_cluster_prefers_the_closer_centroid() {
        let data = toy();
        let set = ClusterSet::from_centroids(vec![data.item_set(0), data.item_set(1)]);
        assert_eq!(set.nearest_cluster(&data.item_set(1)), 1);
        assert_eq!(set.nearest_cluster(&data.item_set(2)), 0);
    }

    #[test]
    fn test_current_cluster_finds_the_holder() {
        let data = toy();
        let mut set = ClusterSet::from_centroids(vec![data.item_set(0), data.item_set(1)]);
        assert_eq!(set.current_cluster(2), None);
        set.get_mut(1).add(2);
        assert_eq!(set.current_cluster(2), Some(1));
    }

    #[test]
    fn test_membership_add_reports_new_rows_only() {
        let data = toy();
        let mut set = ClusterSet::from_centroids(vec![data.item_set(0)]);
        assert!(set.get_mut(0).add(1));
        assert!(!set.get_mut(0).add(1));
        assert!(set.get_mut(0).remove(1));
        assert!(!set.get(0).contains(1));
    }

    #[test]
    fn test_compute_centroid_takes_member_prototypes() {
        let data = toy();
        let mut set = ClusterSet::from_centroids(vec![data.item_set(0)]);
        set.get_mut(0).add(0);
        set.get_mut(0).add(2);
        set.update_centroids(&data);
        let centroid = set.get(0).centroid();
        assert_eq!(centroid.get(0).value(), &Value::Continuous(2.5));
        assert_eq!(centroid.get(1).value(), &Value::Discrete("x".into()));
    }

    #[test]
    fn test_degenerate_clusters_lists_empty_memberships() {
        let data = toy();
        let mut set = ClusterSet::from_centroids(vec![data.item_set(0), data.item_set(1)]);
        set.get_mut(1).add(1);
        assert_eq!(set.degenerate_clusters(), vec![0]);
    }

    #[test]
    fn test_summary_lists_members_with_distances() {
        let data = toy();
        let mut set = ClusterSet::from_centroids(vec![data.item_set(0)]);
        set.get_mut(0).add(0);
        set.get_mut(0).add(1);
        let summary = set.summary_with(&data);
        assert_eq!(
            summary,
            "1:Centroid=(5 x )\nExamples:\n\
             [5 x ] dist = 0.0000\n\
             [10 y ] dist = 1.5000\n\
             AvgDistance=0.7500\n\n"
        );
    }

    #[test]
    fn test_display_renders_centroids_only() {
        let data = toy();
        let set = ClusterSet::from_centroids(vec![data.item_set(0), data.item_set(1)]);
        assert_eq!(set.to_string(), "1:Centroid=(5 x )\n2:Centroid=(10 y )\n");
    }
}
