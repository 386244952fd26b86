//! Record Store.
//!
//! Persists every finalized record to a single JSON array file.  The file is
//! the whole truth: each append reads the full array, pushes one record and
//! writes the full array back.
//!
//! # Storage layout
//!
//! ```json
//! [
//!   {
//!     "drinkType": "latte",
//!     "size": "medium",
//!     "milk": "oat",
//!     "extras": ["caramel", "sugar"],
//!     "name": "Maya",
//!     "timestamp": "2024-01-01T09:30:15Z",
//!     "date": "2024-01-01",
//!     "time": "09:30:15"
//!   }
//! ]
//! ```
//!
//! # Guarantees
//!
//! - Append-only: records already on disk are never modified or removed.
//! - Single writer: `load` and `append` on one `RecordStore` are serialized by
//!   an internal lock, so sessions sharing a store through an `Arc` cannot lose
//!   each other's appends.  Separate processes writing the same file are not
//!   coordinated.
//! - No partial files: the new array is written to a sibling `.tmp` file,
//!   synced to disk and renamed over the container.  A failed write removes
//!   the `.tmp` file.
//! - A missing file reads as empty.  A file that is not a valid record array
//!   (including invalid UTF-8) is corrupt: `load` returns empty with a
//!   warning, and `append` copies the bytes to a `.corrupt` sibling before
//!   replacing them.  Any other read failure makes `append` fail without
//!   writing; `load` still degrades to empty.
//!
//! # Example
//!
//! ```rust
//! use parley_memory::entry::build_coffee_order;
//! use parley_memory::store::RecordStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = RecordStore::open(dir.path().join("orders.json"));
//!
//! let order = build_coffee_order("latte", "medium", "oat", &"caramel".into(), "Maya");
//! assert_eq!(store.append(&order).unwrap(), 1);
//! assert_eq!(store.load(), vec![order]);
//! ```

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use parley_types::ParleyError;
use thiserror::Error;
use tracing::{info, warn};

use crate::record::Record;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise while writing the record container.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for ParleyError {
    fn from(e: StoreError) -> Self {
        ParleyError::Store(e.to_string())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordStore
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of reading the container.
struct Snapshot<R> {
    records: Vec<R>,
    /// The file exists but could not be parsed.
    corrupt: bool,
}

/// Append-only JSON container of `R` records.
pub struct RecordStore<R> {
    path: PathBuf,
    writer: Mutex<()>,
    _records: PhantomData<fn() -> R>,
}

impl<R: Record> RecordStore<R> {
    /// Create a handle for the container at `path`.  Nothing is touched on
    /// disk until the first append.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record, oldest first.
    ///
    /// Never fails: a missing, unreadable or corrupt container reads as an
    /// empty sequence.
    pub fn load(&self) -> Vec<R> {
        let _guard = self.lock();
        match self.read_snapshot() {
            Ok(snapshot) => snapshot.records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "record container unreadable; treating as empty");
                Vec::new()
            }
        }
    }

    /// Number of records currently on disk.
    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `record` and return the new number of records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the existing container cannot be read
    /// or the new one cannot be written, or [`StoreError::Serialize`] if the
    /// sequence cannot be encoded.  On error the container on disk is
    /// unchanged.
    pub fn append(&self, record: &R) -> Result<usize, StoreError> {
        let _guard = self.lock();
        let Snapshot {
            mut records,
            corrupt,
        } = self.read_snapshot()?;
        if corrupt {
            self.preserve_corrupt()?;
        }

        records.push(record.clone());
        self.write_all(&records)?;

        let total = records.len();
        info!(
            total,
            record = %record.label(),
            path = %self.path.display(),
            "record #{total} appended"
        );
        Ok(total)
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guard protects no data, so a panic in another holder leaves
        // nothing inconsistent behind.
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Only a missing file counts as empty.  Bytes that are not a JSON array
    /// of `R` (including invalid UTF-8) are reported as corrupt; any other
    /// read failure is an error, so `append` never overwrites a container it
    /// could not see.
    fn read_snapshot(&self) -> Result<Snapshot<R>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Snapshot {
                    records: Vec::new(),
                    corrupt: false,
                });
            }
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        match serde_json::from_slice::<Vec<R>>(&raw) {
            Ok(records) => Ok(Snapshot {
                records,
                corrupt: false,
            }),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "record container is corrupt; treating as empty");
                Ok(Snapshot {
                    records: Vec::new(),
                    corrupt: true,
                })
            }
        }
    }

    fn preserve_corrupt(&self) -> Result<(), StoreError> {
        let backup = sibling(&self.path, "corrupt");
        fs::copy(&self.path, &backup).map_err(io_error(&backup))?;
        warn!(backup = %backup.display(), "corrupt record container copied aside before overwrite");
        Ok(())
    }

    fn write_all(&self, records: &[R]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = sibling(&self.path, "tmp");

        let mut file = File::create(&tmp).map_err(io_error(&tmp))?;
        let written = file
            .write_all(json.as_bytes())
            .and_then(|()| file.sync_all());
        drop(file);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&tmp)(e));
        }

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(&self.path)(e));
        }
        Ok(())
    }
}

/// `orders.json` → `orders.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
