use std::sync::{Mutex, MutexGuard};

use super::{LockedRecords, RecordStore, StoreError};

/// Process-local store, for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<String>>,
}

impl MemoryStore {
    /// Create a store seeded with `records`
    pub fn with_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: Mutex::new(records.into_iter().map(Into::into).collect()),
        }
    }
}

impl RecordStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }

    fn lock_exclusive(&self) -> Result<Box<dyn LockedRecords + '_>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(Box::new(MemoryLock(records)))
    }
}

/// Exclusive lock on a [`MemoryStore`]
struct MemoryLock<'a>(MutexGuard<'a, Vec<String>>);

impl LockedRecords for MemoryLock<'_> {
    fn read_all(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.0.clone())
    }

    fn atomic_rewrite(&mut self, records: &[String]) -> Result<(), StoreError> {
        *self.0 = records.to_vec();
        Ok(())
    }
}
