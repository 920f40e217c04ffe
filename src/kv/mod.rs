// File: src/kv/mod.rs
//! The narrow contract the frequency store needs from an ordered,
//! transactional key-value engine.

pub mod memory;

use crate::error::Result;

pub use memory::MemoryStore;

/// Owned `(key, value)` pairs in ascending key order.
pub type PrefixIter<'a> = Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

pub trait ReadTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, ascending.
    /// The cursor is released when the iterator is dropped.
    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> PrefixIter<'a>;
}

pub trait WriteTxn: ReadTxn {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
}

pub trait KvStore {
    /// Runs `f` against a consistent snapshot.
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>;

    /// Runs `f` in a read-write transaction, committed only if `f` returns `Ok`.
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>;

    /// Wipes every entry.
    fn drop_all(&self) -> Result<()>;
}
