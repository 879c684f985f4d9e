//! Command line configuration for the server binary.

use std::error::Error;
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE: &str = "kmeans.db";
const DEFAULT_STORAGE: &str = ".";

pub struct Config {
    port:     u16,
    database: PathBuf,
    storage:  PathBuf,
}

impl Config {
    /// Builds a configuration from the command line.
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- 8080 data/maps.db runs
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<Config, Box<dyn Error>> {
        // args:
        // 0: program name
        // 1: listening port
        // 2: sqlite database path
        // 3: directory for stored runs
        args.next();
        let port = match args.next() {
            Some(raw) => raw.parse::<u16>()?,
            None => DEFAULT_PORT,
        };
        let database = args
            .next()
            .map_or_else(|| PathBuf::from(DEFAULT_DATABASE), PathBuf::from);
        let storage = args
            .next()
            .map_or_else(|| PathBuf::from(DEFAULT_STORAGE), PathBuf::from);

        Ok(Config {
            port,
            database,
            storage,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn storage(&self) -> &Path {
        &self.storage
    }
}
