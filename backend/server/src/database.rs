//! # Redis
//!
//! Store behind the forms when `STORE=redis`.
//!
//! ## Layout
//!
//! - `contact_submissions`: list of JSON rows, appended with `RPUSH`
//! - `waitlist`: hash of email to creation time (RFC 3339)
//!
//! ## Uniqueness
//! Waitlist inserts use `HSETNX`, which only writes when the field is missing.
//! Redis runs it as one command, so two racing joins for the same email get
//! exactly one `1` reply between them. A `0` reply is our uniqueness violation.
use std::{collections::HashMap, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forms::{ContactSubmission, Gateway, StoreError, WaitlistEntry};
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

pub const CONTACT_KEY: &str = "contact_submissions";
pub const WAITLIST_KEY: &str = "waitlist";

#[derive(Clone)]
pub struct RedisGateway {
    connection: ConnectionManager,
}

impl RedisGateway {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url).context("Invalid REDIS_URL")?;
        let connection = client
            .get_connection_manager_with_config(config)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { connection })
    }
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// `HSETNX` answers `false` when the email was already there.
fn waitlist_insert(created: bool) -> Result<(), StoreError> {
    if created {
        Ok(())
    } else {
        Err(StoreError::UniqueConstraintViolation)
    }
}

fn decode_submission(row: &str) -> Result<ContactSubmission, StoreError> {
    serde_json::from_str(row).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_entry(email: &str, created_at: &str) -> Result<WaitlistEntry, StoreError> {
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| StoreError::Corrupt(format!("waitlist {email}: {e}")))?
        .with_timezone(&Utc);

    Ok(WaitlistEntry {
        email: email.to_string(),
        created_at,
    })
}

#[async_trait]
impl Gateway for RedisGateway {
    async fn insert_contact_submission(&self, record: &ContactSubmission) -> Result<(), StoreError> {
        let row = serde_json::to_string(record).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut connection = self.connection.clone();
        let _: () = connection.rpush(CONTACT_KEY, row).await.map_err(unavailable)?;

        Ok(())
    }

    async fn insert_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let created: bool = connection
            .hset_nx(WAITLIST_KEY, &entry.email, entry.created_at.to_rfc3339())
            .await
            .map_err(unavailable)?;

        waitlist_insert(created)
    }

    async fn find_waitlist_entry(&self, email: &str) -> Result<Option<WaitlistEntry>, StoreError> {
        let mut connection = self.connection.clone();
        let created_at: Option<String> = connection
            .hget(WAITLIST_KEY, email)
            .await
            .map_err(unavailable)?;

        created_at
            .map(|created_at| decode_entry(email, &created_at))
            .transpose()
    }

    async fn list_contact_submissions(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        let mut connection = self.connection.clone();
        let rows: Vec<String> = connection
            .lrange(CONTACT_KEY, 0, -1)
            .await
            .map_err(unavailable)?;

        rows.iter().map(|row| decode_submission(row)).collect()
    }

    async fn list_waitlist_entries(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        let mut connection = self.connection.clone();
        let rows: HashMap<String, String> = connection
            .hgetall(WAITLIST_KEY)
            .await
            .map_err(unavailable)?;

        let mut entries = rows
            .iter()
            .map(|(email, created_at)| decode_entry(email, created_at))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsetnx_reply_mapping() {
        assert_eq!(waitlist_insert(true), Ok(()));
        assert_eq!(
            waitlist_insert(false),
            Err(StoreError::UniqueConstraintViolation)
        );
    }

    #[test]
    fn test_decode_entry() {
        let entry = decode_entry("a@b.com", "2026-01-02T03:04:05+00:00").unwrap();

        assert_eq!(entry.email, "a@b.com");
        assert_eq!(entry.created_at.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_decode_entry_rejects_garbage() {
        assert!(matches!(
            decode_entry("a@b.com", "last tuesday"),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_submission_row_round_trip() {
        let record = ContactSubmission {
            name: "Jo".to_string(),
            email: "jo@x.com".to_string(),
            company: String::new(),
            subject: "Hi".to_string(),
            message: "&lt;b&gt;hello&lt;/b&gt;".to_string(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        let row = serde_json::to_string(&record).unwrap();
        assert_eq!(decode_submission(&row).unwrap(), record);
        assert!(matches!(decode_submission("{"), Err(StoreError::Corrupt(_))));
    }
}
