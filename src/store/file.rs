use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use super::{parse_records, LockedRecords, RecordStore, StoreError};

/// Flat file guarded by an advisory lock on a sibling `.lock` file
///
/// The lock lives in its own file because write-back renames a fresh file over the data file,
/// which would silently drop a lock taken on the data file itself.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Open a store at `path`, creating its parent directory if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = parent_dir(&path) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let mut lock_path = OsString::from(path.as_os_str());
        lock_path.push(".lock");
        Ok(Self {
            path,
            lock_path: lock_path.into(),
        })
    }

    /// Location of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for FileStore {
    fn read_all(&self) -> Result<Vec<String>, StoreError> {
        read_records(&self.path)
    }

    #[tracing::instrument(name = "Locking record file", skip(self), fields(path = %self.path.display()))]
    fn lock_exclusive(&self) -> Result<Box<dyn LockedRecords + '_>, StoreError> {
        let lock_error = |source| StoreError::Lock {
            path: self.lock_path.clone(),
            source,
        };
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(lock_error)?;
        FileExt::lock_exclusive(&lock_file).map_err(lock_error)?;
        Ok(Box::new(FileLock {
            store: self,
            lock_file,
        }))
    }
}

/// Exclusive lock on a [`FileStore`], released on drop
struct FileLock<'a> {
    store: &'a FileStore,
    lock_file: File,
}

impl LockedRecords for FileLock<'_> {
    fn read_all(&mut self) -> Result<Vec<String>, StoreError> {
        read_records(&self.store.path)
    }

    fn atomic_rewrite(&mut self, records: &[String]) -> Result<(), StoreError> {
        write_records(&self.store.path, records).map_err(|source| StoreError::Write {
            path: self.store.path.clone(),
            source,
        })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        // Closing the handle releases the lock anyway, this just makes it prompt
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            tracing::warn!(
                error.message = %e,
                "Failed to release lock on {}", self.store.lock_path.display()
            );
        }
    }
}

/// Directory holding `path`, if it has a non-empty parent
fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Read all records; a missing file is an empty collection
fn read_records(path: &Path) -> Result<Vec<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_records(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write records to a temporary file in the same directory, sync it, then rename it over `path`
fn write_records(path: &Path, records: &[String]) -> io::Result<()> {
    let dir = parent_dir(path).unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    for record in records {
        writeln!(tmp, "{record}")?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    // The rename only survives a power loss once the directory entry is on disk
    sync_dir(dir)
}

/// Flush a directory's entries to storage
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
