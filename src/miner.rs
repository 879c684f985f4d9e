//! The k-means engine: runs the refinement loop to convergence and moves
//! finished models to and from durable storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterSet;
use crate::dataset::Dataset;
use crate::error::{OutOfRangeSampleSize, PersistError};

/// Extension appended to every stored model artifact.
const ARTIFACT_EXTENSION: &str = "dmp";

/// A converged clustering: the refined cluster set plus the report text
/// rendered when the run finished.
///
/// The report is rendered once, against the dataset the run was executed
/// on, and travels with the cluster set through [`save`](KMeansMiner::save)
/// and [`load`](KMeansMiner::load). Reloading therefore reproduces the
/// exact text of the original run without touching the data source again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansMiner {
    clusters: ClusterSet,
    summary: String,
}

impl KMeansMiner {
    /// Seeds `k` clusters from distinct-valued rows of `data` and refines
    /// them until a full pass moves no row, recomputing every centroid at
    /// the end of each pass. Returns the converged miner and the number of
    /// passes executed.
    pub fn discover(data: &Dataset, k: usize) -> Result<(Self, u32), OutOfRangeSampleSize> {
        let mut clusters = ClusterSet::initialize(data, k)?;
        let mut passes = 0u32;
        loop {
            passes += 1;
            let mut changed = false;
            for row in 0..data.number_of_examples() {
                let tuple = data.item_set(row);
                let nearest = clusters.nearest_cluster(&tuple);
                let previous = clusters.current_cluster(row);
                if clusters.get_mut(nearest).add(row) {
                    changed = true;
                    if let Some(old) = previous {
                        clusters.get_mut(old).remove(row);
                    }
                }
            }
            clusters.update_centroids(data);
            if !changed {
                break;
            }
        }
        debug!("refinement converged after {} passes", passes);
        let degenerate = clusters.degenerate_clusters();
        if !degenerate.is_empty() {
            warn!(
                "{} of {} clusters converged empty: {:?}",
                degenerate.len(),
                clusters.len(),
                degenerate
            );
        }
        let summary = clusters.summary_with(data);
        Ok((Self { clusters, summary }, passes))
    }

    pub fn cluster_set(&self) -> &ClusterSet {
        &self.clusters
    }

    /// Report text rendered at the end of the discovery run.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Location of the artifact for `identifier` under `dir`.
    pub fn artifact_path(dir: &Path, identifier: &str) -> PathBuf {
        dir.join(format!("{}.{}", identifier, ARTIFACT_EXTENSION))
    }

    /// Writes this miner to `path`, replacing any previous artifact.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Reads a previously saved miner back from `path`.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PersistError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(PersistError::Io(e)),
        };
        let (miner, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(miner)
    }
}
