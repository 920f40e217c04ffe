// File: src/storage/mod.rs
//! Persistent lemma mappings and single/pair frequency counters.

pub mod read;
pub mod schema;
pub mod write;

use crate::error::Result;
use crate::kv::KvStore;
use tracing::debug;

pub use read::LemmaMatch;
pub use schema::SchemaVersion;
pub use write::LoadSummary;

/// Frequency store on top of any ordered transactional key-value engine.
#[derive(Debug)]
pub struct FreqDb<S: KvStore> {
    store: S,
    schema: SchemaVersion,
}

impl<S: KvStore> FreqDb<S> {
    /// Wraps `store`, recording `schema` in an empty store or verifying it
    /// against the marker already present.
    pub fn open(store: S, schema: SchemaVersion) -> Result<Self> {
        let schema = schema::ensure_schema(&store, schema)?;
        debug!(?schema, "frequency store ready");
        Ok(Self { store, schema })
    }

    /// Like [`FreqDb::open`] but adopts whatever schema the store already has.
    pub fn open_existing(store: S) -> Result<Self> {
        let schema = schema::stored_schema(&store)?.unwrap_or_default();
        Self::open(store, schema)
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Wipes the whole store and re-records the schema marker.
    pub fn flush_all(&self) -> Result<()> {
        self.store.drop_all()?;
        schema::ensure_schema(&self.store, self.schema)?;
        Ok(())
    }
}
