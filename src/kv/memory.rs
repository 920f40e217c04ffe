// File: src/kv/memory.rs
use crate::error::Result;
use crate::kv::{KvStore, PrefixIter, ReadTxn, WriteTxn};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered in-memory store.
///
/// Readers work on an `Arc` snapshot of the map and never block the writer.
/// Writers are serialized by `writer`; a write transaction buffers its changes
/// and publishes them in one step on commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Arc<Map>>,
    writer: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(map: Map) -> Self {
        Self { data: RwLock::new(Arc::new(map)), writer: Mutex::new(()) }
    }

    /// Current committed state.
    pub(crate) fn snapshot(&self) -> Arc<Map> {
        self.data.read().clone()
    }

    /// Runs `f` on the committed state while holding the writer lock, so no
    /// commit can land in between.
    pub(crate) fn with_committed<T>(&self, f: impl FnOnce(&Map) -> Result<T>) -> Result<T> {
        let _writer = self.writer.lock();
        f(&self.snapshot())
    }

    /// Like [`KvStore::update`], but `persist` sees the state the commit would
    /// produce before it is published. If `persist` fails nothing is published.
    pub(crate) fn update_persisted<T, F, P>(&self, f: F, persist: P) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
        P: FnOnce(&Map) -> Result<()>,
    {
        let _writer = self.writer.lock();
        let mut txn = MemTxn { base: self.snapshot(), pending: Map::new() };
        let out = f(&mut txn)?;

        let MemTxn { base, pending } = txn;
        if pending.is_empty() {
            return Ok(out);
        }
        let mut next = Map::clone(&base);
        drop(base);
        next.extend(pending);
        persist(&next)?;
        *self.data.write() = Arc::new(next);
        Ok(out)
    }

    /// Empties the store once `persist` has accepted the empty state.
    pub(crate) fn drop_all_persisted(&self, persist: impl FnOnce(&Map) -> Result<()>) -> Result<()> {
        let _writer = self.writer.lock();
        let empty = Map::new();
        persist(&empty)?;
        *self.data.write() = Arc::new(empty);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

fn prefix_range<'a>(map: &'a Map, prefix: &[u8]) -> impl Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)> {
    let owned = prefix.to_vec();
    map.range(owned.clone()..).take_while(move |(k, _)| k.starts_with(&owned))
}

struct Snapshot {
    map: Arc<Map>,
}

impl ReadTxn for Snapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> PrefixIter<'a> {
        Box::new(prefix_range(&self.map, prefix).map(|(k, v)| (k.clone(), v.clone())))
    }
}

struct MemTxn {
    base: Arc<Map>,
    pending: Map,
}

impl ReadTxn for MemTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.pending.get(key).or_else(|| self.base.get(key)).cloned())
    }

    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> PrefixIter<'a> {
        let mut merged: Map = prefix_range(&self.base, prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (k, v) in prefix_range(&self.pending, prefix) {
            merged.insert(k.clone(), v.clone());
        }
        Box::new(merged.into_iter())
    }
}

impl WriteTxn for MemTxn {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.pending.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        let snap = Snapshot { map: self.snapshot() };
        f(&snap)
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
    {
        let _writer = self.writer.lock();
        let mut txn = MemTxn { base: self.snapshot(), pending: Map::new() };
        let out = f(&mut txn)?;

        let MemTxn { base, pending } = txn;
        drop(base);
        if !pending.is_empty() {
            let mut data = self.data.write();
            Arc::make_mut(&mut *data).extend(pending);
        }
        Ok(out)
    }

    fn drop_all(&self) -> Result<()> {
        let _writer = self.writer.lock();
        *self.data.write() = Arc::new(Map::new());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn keys(txn: &dyn ReadTxn, prefix: &[u8]) -> Vec<Vec<u8>> {
        txn.scan_prefix(prefix).map(|(k, _)| k).collect()
    }

    #[test]
    fn scan_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        store
            .update(|txn| {
                txn.set(b"b2", b"x")?;
                txn.set(b"a", b"x")?;
                txn.set(b"b1", b"x")?;
                txn.set(b"c", b"x")
            })
            .unwrap();
        let found = store.view(|txn| Ok(keys(txn, b"b"))).unwrap();
        assert_eq!(found, vec![b"b1".to_vec(), b"b2".to_vec()]);
    }

    #[test]
    fn failed_update_is_discarded() {
        let store = MemoryStore::new();
        let res: Result<()> = store.update(|txn| {
            txn.set(b"k", b"v")?;
            Err(Error::storage("boom"))
        });
        assert!(res.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn write_txn_reads_its_own_writes() {
        let store = MemoryStore::new();
        store.update(|txn| txn.set(b"p1", b"old")).unwrap();
        store
            .update(|txn| {
                txn.set(b"p1", b"new")?;
                txn.set(b"p0", b"x")?;
                assert_eq!(txn.get(b"p1")?, Some(b"new".to_vec()));
                let scanned: Vec<_> = txn.scan_prefix(b"p").collect();
                assert_eq!(
                    scanned,
                    vec![
                        (b"p0".to_vec(), b"x".to_vec()),
                        (b"p1".to_vec(), b"new".to_vec())
                    ]
                );
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn readers_see_a_stable_snapshot() {
        let store = MemoryStore::new();
        store.update(|txn| txn.set(b"k", b"1")).unwrap();
        store
            .view(|snap| {
                store.update(|txn| txn.set(b"k", b"2"))?;
                assert_eq!(snap.get(b"k")?, Some(b"1".to_vec()));
                Ok(())
            })
            .unwrap();
        assert_eq!(store.view(|txn| txn.get(b"k")).unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn rejected_persist_publishes_nothing() {
        let store = MemoryStore::new();
        store.update(|txn| txn.set(b"k", b"1")).unwrap();
        let res: Result<()> = store.update_persisted(
            |txn| txn.set(b"k", b"2"),
            |next| {
                assert_eq!(next.get(&b"k"[..]), Some(&b"2".to_vec()));
                Err(Error::storage("disk full"))
            },
        );
        assert!(res.is_err());
        assert_eq!(store.view(|txn| txn.get(b"k")).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn drop_all_clears() {
        let store = MemoryStore::new();
        store.update(|txn| txn.set(b"k", b"v")).unwrap();
        store.drop_all().unwrap();
        assert_eq!(store.len(), 0);
    }
}
