//! Durable, line-oriented record collections shared by concurrent processes.
//!
//! Every mutation goes through [`with_exclusive_lock`]: the records are read, transformed and
//! written back while the exclusive lock is held, and the write-back replaces the whole
//! collection at once, so readers see either the old or the new content.

use std::io;
use std::path::PathBuf;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Record store error
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Failed to read records from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write records to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to acquire exclusive lock on {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("In-memory record store was poisoned by a panicking writer")]
    Poisoned,
    #[error("{0:?} cannot be stored as a record field")]
    InvalidField(String),
}

/// Collection of records, one per line, in storage order
pub trait RecordStore: Send + Sync {
    /// Snapshot of all records, taken without the exclusive lock
    fn read_all(&self) -> Result<Vec<String>, StoreError>;

    /// Block until the exclusive lock is held; it is released when the handle is dropped
    fn lock_exclusive(&self) -> Result<Box<dyn LockedRecords + '_>, StoreError>;
}

/// Records held under the exclusive lock
pub trait LockedRecords {
    /// Read all records
    fn read_all(&mut self) -> Result<Vec<String>, StoreError>;

    /// Replace the whole collection, leaving either the old or the new content on failure
    fn atomic_rewrite(&mut self, records: &[String]) -> Result<(), StoreError>;
}

/// Run a read-modify-write sequence while holding the exclusive lock on `store`
pub fn with_exclusive_lock<T, E, F>(store: &dyn RecordStore, f: F) -> Result<T, E>
where
    E: From<StoreError>,
    F: FnOnce(&mut dyn LockedRecords) -> Result<T, E>,
{
    let mut records = store.lock_exclusive()?;
    f(&mut *records)
}

/// Reject a field that is empty or would split or corrupt a line record
pub fn check_field(value: &str) -> Result<&str, StoreError> {
    if value.is_empty() || value.contains(['\n', '\r', '\t']) {
        Err(StoreError::InvalidField(value.to_owned()))
    } else {
        Ok(value)
    }
}

/// Split raw file content into records, skipping blank lines
fn parse_records(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
