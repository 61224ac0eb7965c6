use std::sync::Arc;

use crate::clock::Clock;
use crate::store::{check_field, with_exclusive_lock, RecordStore, StoreError};

/// Seconds during which an issued code can be validated
pub const TTL_VALIDATE: i64 = 600;

/// Seconds after which an issued code is swept regardless of its outcome
pub const TTL_RETAIN: i64 = 3600;

/// Field separator in stored records; never accepted in an email address or a code
const FIELD_DELIMITER: char = '\t';

/// Pending verification code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    pub email: String,
    pub code: String,
    pub issued_at: i64,
}

impl VerificationEntry {
    /// Serialize as `email<TAB>code<TAB>issued_at`
    fn to_record(&self) -> String {
        format!(
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.email, self.code, self.issued_at
        )
    }

    /// Parse a stored record, returning `None` if it is malformed
    fn from_record(record: &str) -> Option<Self> {
        let mut fields = record.split(FIELD_DELIMITER);
        let (email, code, issued_at) = (fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            email: email.to_owned(),
            code: code.to_owned(),
            issued_at: issued_at.parse().ok()?,
        })
    }

    /// Whether the entry was issued less than `window` seconds before `now`
    ///
    /// Entries dated in the future were not written by this ledger's clock and never count as live.
    const fn is_live(&self, now: i64, window: i64) -> bool {
        self.issued_at <= now && now.saturating_sub(self.issued_at) < window
    }
}

/// Verification ledger error
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// Wrong code, wrong email, expired code and no code at all look the same to the caller
    #[error("Invalid or expired verification code")]
    InvalidOrExpired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable collection of pending verification codes
#[derive(Clone)]
pub struct VerificationLedger {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationLedger {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record a freshly issued `code` for `email`; earlier codes for the same email stay valid
    #[tracing::instrument(name = "Storing verification code", skip(self, code))]
    pub fn issue(&self, email: &str, code: &str) -> Result<(), StoreError> {
        let entry = VerificationEntry {
            email: check_field(email)?.to_owned(),
            code: check_field(code)?.to_owned(),
            issued_at: self.clock.now(),
        };
        with_exclusive_lock(self.store.as_ref(), |locked| {
            let mut records = locked.read_all()?;
            records.push(entry.to_record());
            locked.atomic_rewrite(&records)
        })
    }

    /// Consume the first unexpired entry matching `email` and `code` exactly
    #[tracing::instrument(name = "Validating verification code", skip(self, code))]
    pub fn validate(&self, email: &str, code: &str) -> Result<(), LedgerError> {
        let now = self.clock.now();
        with_exclusive_lock(self.store.as_ref(), |locked| {
            let mut entries = read_entries(locked.read_all()?);
            let position = entries
                .iter()
                .position(|e| e.email == email && e.code == code && e.is_live(now, TTL_VALIDATE))
                .ok_or(LedgerError::InvalidOrExpired)?;
            entries.remove(position);
            locked.atomic_rewrite(&write_entries(&entries))?;
            Ok(())
        })
    }

    /// Drop every entry issued `retention_secs` or more ago, or dated in the future, returning how
    /// many records went away
    #[tracing::instrument(name = "Sweeping expired verification codes", skip(self))]
    pub fn sweep(&self, retention_secs: i64) -> Result<usize, StoreError> {
        let now = self.clock.now();
        with_exclusive_lock(self.store.as_ref(), |locked| {
            let records = locked.read_all()?;
            let total = records.len();
            let kept: Vec<VerificationEntry> = read_entries(records)
                .into_iter()
                .filter(|e| e.is_live(now, retention_secs))
                .collect();
            let removed = total - kept.len();
            if removed > 0 {
                locked.atomic_rewrite(&write_entries(&kept))?;
                tracing::info!("Swept {removed} expired verification codes");
            }
            Ok(removed)
        })
    }

    /// Every stored entry, expired or not, in issue order
    pub fn entries(&self) -> Result<Vec<VerificationEntry>, StoreError> {
        Ok(read_entries(self.store.read_all()?))
    }
}

/// Parse records, dropping malformed ones
fn read_entries(records: Vec<String>) -> Vec<VerificationEntry> {
    records
        .into_iter()
        .filter_map(|record| {
            let entry = VerificationEntry::from_record(&record);
            if entry.is_none() {
                tracing::warn!("Dropping malformed verification record");
            }
            entry
        })
        .collect()
}

fn write_entries(entries: &[VerificationEntry]) -> Vec<String> {
    entries.iter().map(VerificationEntry::to_record).collect()
}
