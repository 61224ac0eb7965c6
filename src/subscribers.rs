use std::sync::Arc;

use crate::store::{check_field, with_exclusive_lock, RecordStore, StoreError};

/// Subscriber set error
#[derive(thiserror::Error, Debug)]
pub enum SubscriberError {
    #[error("{0} is already subscribed")]
    AlreadyExists(String),
    #[error("{0} is not subscribed")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable set of subscribed email addresses, in insertion order
#[derive(Clone)]
pub struct SubscriberSet {
    store: Arc<dyn RecordStore>,
}

impl SubscriberSet {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Check whether the trimmed `email` is subscribed (exact, case-sensitive match)
    #[tracing::instrument(name = "Checking subscription", skip(self))]
    pub fn contains(&self, email: &str) -> Result<bool, StoreError> {
        let email = email.trim();
        Ok(self.store.read_all()?.iter().any(|stored| stored == email))
    }

    /// Subscribe the trimmed `email`; it must fit on a single line
    #[tracing::instrument(name = "Adding subscriber", skip(self))]
    pub fn add(&self, email: &str) -> Result<(), SubscriberError> {
        let email = check_field(email.trim())?;
        with_exclusive_lock(self.store.as_ref(), |locked| {
            let mut subscribers = locked.read_all()?;
            if subscribers.iter().any(|stored| stored == email) {
                return Err(SubscriberError::AlreadyExists(email.to_owned()));
            }
            subscribers.push(email.to_owned());
            locked.atomic_rewrite(&subscribers)?;
            Ok(())
        })
    }

    /// Unsubscribe the trimmed `email`, dropping every copy of it
    #[tracing::instrument(name = "Removing subscriber", skip(self))]
    pub fn remove(&self, email: &str) -> Result<(), SubscriberError> {
        let email = email.trim();
        with_exclusive_lock(self.store.as_ref(), |locked| {
            let subscribers = locked.read_all()?;
            let before = subscribers.len();
            let remaining: Vec<String> = subscribers
                .into_iter()
                .filter(|stored| stored != email)
                .collect();
            if remaining.len() == before {
                return Err(SubscriberError::NotFound(email.to_owned()));
            }
            if before - remaining.len() > 1 {
                tracing::warn!("Removed {} duplicate entries", before - remaining.len());
            }
            locked.atomic_rewrite(&remaining)?;
            Ok(())
        })
    }

    /// All subscribers in insertion order
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        self.store.read_all()
    }
}
