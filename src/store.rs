//! Result stores: durable keyed storage for analysis records.
//!
//! A store is constructed by the caller and handed to the
//! [`Analyzer`](crate::pipeline::Analyzer); there is no global connection.
//! Stores own their concurrency, and identifier assignment never hands
//! out the same id twice.
//!
//! - [`MemoryStore`] keeps records in a map (tests, `storage.backend = "memory"`).
//! - [`JsonFileStore`] writes one JSON document per identifier into a directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::summary::{FileId, NewAnalysis, StoredAnalysis};

/// Errors raised inside a result store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable keyed storage for analysis records.
pub trait ResultStore: Send + Sync {
    /// Persists `record` and returns its newly issued identifier.
    ///
    /// Either the whole record is stored or an error is returned.
    fn save(&self, record: NewAnalysis) -> Result<FileId, StoreError>;

    /// Loads the record stored under `id`, or `None` if there is none.
    fn load(&self, id: FileId) -> Result<Option<StoredAnalysis>, StoreError>;
}

// ── MemoryStore ───────────────────────────────────────────────────────

/// In-process store backed by a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: u64,
    records: BTreeMap<FileId, StoredAnalysis>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for MemoryStore {
    fn save(&self, record: NewAnalysis) -> Result<FileId, StoreError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = FileId(inner.next_id);
        inner.records.insert(id, StoredAnalysis::from_new(id, record));
        Ok(id)
    }

    fn load(&self, id: FileId) -> Result<Option<StoredAnalysis>, StoreError> {
        Ok(self.inner.lock().records.get(&id).cloned())
    }
}

// ── JsonFileStore ─────────────────────────────────────────────────────

/// Directory of `{id}.json` documents.
///
/// Identifiers are claimed by creating the target file with `create_new`,
/// so two processes sharing a directory cannot issue the same id. Records
/// are written to a temporary file first and renamed into place.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    alloc: Mutex<u64>,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let highest = highest_id(&root)?;
        debug!(root = %root.display(), highest, "json store opened");
        Ok(Self {
            root,
            alloc: Mutex::new(highest),
        })
    }

    /// Directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: FileId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Claims the next free identifier by creating an empty placeholder file.
    fn claim_id(&self) -> Result<FileId, StoreError> {
        let mut next = self.alloc.lock();
        loop {
            *next += 1;
            let id = FileId(*next);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.record_path(id))
            {
                Ok(_) => return Ok(id),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ResultStore for JsonFileStore {
    fn save(&self, record: NewAnalysis) -> Result<FileId, StoreError> {
        let id = self.claim_id()?;
        let stored = StoredAnalysis::from_new(id, record);
        let path = self.record_path(id);

        let write = || -> Result<(), StoreError> {
            let tmp = self.root.join(format!(".{id}.json.tmp"));
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, &stored)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&tmp, &path)?;
            Ok(())
        };

        if let Err(e) = write() {
            warn!(file_id = %id, error = %e, "failed to write record, releasing id");
            let _ = fs::remove_file(self.root.join(format!(".{id}.json.tmp")));
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        Ok(id)
    }

    fn load(&self, id: FileId) -> Result<Option<StoredAnalysis>, StoreError> {
        let bytes = match fs::read(self.record_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // a claimed id whose record is still being written
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Largest `{id}.json` number present in `root`, or 0.
fn highest_id(root: &Path) -> Result<u64, StoreError> {
    let mut highest = 0;
    for entry in fs::read_dir(root)? {
        let name = entry?.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|n| n.parse::<u64>().ok())
        else {
            continue;
        };
        highest = highest.max(id);
    }
    Ok(highest)
}

// ── Tests ─────────────────────────────────────────────────────────────
