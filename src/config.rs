// File: src/config.rs
use crate::core::types::SortingMeasure;
use crate::error::Result;
use crate::persistence::FileStoreOptions;
use crate::storage::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const DEFAULT_DB_PATH: &str = "collocations.db";

/// Settings shared by the loader and the query side. Every field is optional
/// in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub schema: SchemaVersion,
    pub sync_writes: bool,
    /// Pairs seen fewer times than this are not stored by a bulk load.
    pub min_pair_freq: u32,
    pub corpus_size: u64,
    pub limit: usize,
    pub sort_by: SortingMeasure,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            schema: SchemaVersion::V1,
            sync_writes: false,
            min_pair_freq: 1,
            corpus_size: 0,
            limit: 10,
            sort_by: SortingMeasure::LDice,
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn store_options(&self) -> FileStoreOptions {
        FileStoreOptions { sync_writes: self.sync_writes }
    }
}
