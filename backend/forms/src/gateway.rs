//! # Persistence Gateway
//!
//! The only way the forms touch the store. Implementations own the storage
//! engine; callers only see rows and a [`StoreError`] that tells a uniqueness
//! conflict apart from everything else.
//!
//! Waitlist uniqueness is the store's job: `insert_waitlist_entry` must fail
//! with [`StoreError::UniqueConstraintViolation`] when the email is already
//! there, atomically with respect to other inserts of the same email.
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unique constraint violation")]
    UniqueConstraintViolation,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub company: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEntry {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn insert_contact_submission(&self, record: &ContactSubmission) -> Result<(), StoreError>;

    async fn insert_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<(), StoreError>;

    async fn find_waitlist_entry(&self, email: &str) -> Result<Option<WaitlistEntry>, StoreError>;

    async fn list_contact_submissions(&self) -> Result<Vec<ContactSubmission>, StoreError>;

    async fn list_waitlist_entries(&self) -> Result<Vec<WaitlistEntry>, StoreError>;
}

/// Process-local store for development and tests.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    contact_submissions: Mutex<Vec<ContactSubmission>>,
    waitlist: Mutex<BTreeMap<String, WaitlistEntry>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn insert_contact_submission(&self, record: &ContactSubmission) -> Result<(), StoreError> {
        self.contact_submissions.lock().await.push(record.clone());
        Ok(())
    }

    async fn insert_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<(), StoreError> {
        let mut waitlist = self.waitlist.lock().await;

        if waitlist.contains_key(&entry.email) {
            return Err(StoreError::UniqueConstraintViolation);
        }

        waitlist.insert(entry.email.clone(), entry.clone());
        Ok(())
    }

    async fn find_waitlist_entry(&self, email: &str) -> Result<Option<WaitlistEntry>, StoreError> {
        Ok(self.waitlist.lock().await.get(email).cloned())
    }

    async fn list_contact_submissions(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        Ok(self.contact_submissions.lock().await.clone())
    }

    async fn list_waitlist_entries(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        Ok(self.waitlist.lock().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str) -> WaitlistEntry {
        WaitlistEntry {
            email: email.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_waitlist_conflict() {
        let gateway = MemoryGateway::new();

        gateway.insert_waitlist_entry(&entry("a@b.com")).await.unwrap();
        assert_eq!(
            gateway.insert_waitlist_entry(&entry("a@b.com")).await,
            Err(StoreError::UniqueConstraintViolation)
        );
        assert_eq!(gateway.list_waitlist_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_waitlist_entry() {
        let gateway = MemoryGateway::new();
        let first = entry("a@b.com");

        gateway.insert_waitlist_entry(&first).await.unwrap();

        assert_eq!(gateway.find_waitlist_entry("a@b.com").await, Ok(Some(first)));
        assert_eq!(gateway.find_waitlist_entry("c@d.com").await, Ok(None));
    }
}
