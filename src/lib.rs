//! Clustering server over relational tables.
//!
//! The crate discovers k-means clusters on a SQLite table whose columns
//! mix continuous and discrete attributes, renders a textual report,
//! stores the discovered clusters on disk, and serves both fresh runs
//! and stored runs over a small framed TCP protocol.

pub mod attribute;
pub mod client;
pub mod cluster;
pub mod config;
pub mod database;
pub mod dataset;
pub mod error;
pub mod miner;
pub mod protocol;
pub mod server;
pub mod tuple;

pub use attribute::{Attribute, ContinuousAttribute, DiscreteAttribute};
pub use client::MiningClient;
pub use cluster::{Cluster, ClusterSet};
pub use config::Config;
pub use database::{ColumnDomain, SqliteProvider, TableColumn, TableProvider, TableSnapshot};
pub use dataset::Dataset;
pub use error::{
    ClientError, DatabaseError, DatasetError, OutOfRangeSampleSize, PersistError, ProtocolError,
};
pub use miner::KMeansMiner;
pub use server::MiningServer;
pub use tuple::{Item, Tuple, Value};
