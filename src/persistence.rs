// File: src/persistence.rs
use crate::error::Result;
use crate::kv::memory::Map;
use crate::kv::{KvStore, MemoryStore, ReadTxn, WriteTxn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The serializable state of the store.
#[derive(serde::Serialize, serde::Deserialize)]
struct SerializableState {
    entries: Map,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileStoreOptions {
    /// Persist after every committed update instead of only on flush/close.
    pub sync_writes: bool,
}

/// A [`MemoryStore`] backed by a single snapshot file.
///
/// The file is replaced atomically on every save, so a crash leaves either
/// the previous or the new state on disk.
#[derive(Debug)]
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
    options: FileStoreOptions,
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>, options: FileStoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let entries = load_from_disk(&path)?;
            info!(path = %path.display(), entries = entries.len(), "opened store");
            MemoryStore::from_map(entries)
        } else {
            info!(path = %path.display(), "creating new store");
            MemoryStore::new()
        };
        Ok(Self { inner, path, options })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.with_committed(|entries| save_to_disk(entries, &self.path))
    }

    /// Flushes and releases the store.
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    /// Size of the snapshot file in bytes, zero if it was never written.
    pub fn size(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KvStore for FileStore {
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        self.inner.view(f)
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
    {
        if self.options.sync_writes {
            // Saved before publishing: a failed save leaves memory and file unchanged.
            self.inner.update_persisted(f, |entries| save_to_disk(entries, &self.path))
        } else {
            self.inner.update(f)
        }
    }

    fn drop_all(&self) -> Result<()> {
        self.inner.drop_all_persisted(|entries| save_to_disk(entries, &self.path))
    }
}

fn save_to_disk(entries: &Map, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, &SerializableStateRef { entries })?;
        writer.flush()?;
    }
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), entries = entries.len(), "store saved");
    Ok(())
}

fn load_from_disk(path: &Path) -> Result<Map> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let state: SerializableState = bincode::deserialize_from(reader)?;
    Ok(state.entries)
}

/// Borrowing twin of [`SerializableState`]; serializes identically.
#[derive(serde::Serialize)]
struct SerializableStateRef<'a> {
    entries: &'a Map,
}
