// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod kv;
pub mod persistence;
pub mod storage;

pub use crate::core::engine::{CollocationEngine, CollocationQuery};
pub use crate::core::registry::TokenIdSequence;
pub use crate::core::types::{Collocation, PairStats, SortingMeasure, TokenId, NO_TOKEN};
pub use crate::error::{Error, Result};
pub use crate::kv::{KvStore, MemoryStore};
pub use crate::persistence::{FileStore, FileStoreOptions};
pub use crate::storage::{FreqDb, LoadSummary, SchemaVersion};
