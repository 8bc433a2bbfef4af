//! [`tower_sessions`] backend over the same session table.
//!
//! With this, a [`SqlStore`] can be handed straight to a
//! `SessionManagerLayer`. tower-sessions then owns the cookie and the
//! identifier format, while rows, payload encoding and sweeping stay shared
//! with the cookie-codec API.

use async_trait::async_trait;
use time::OffsetDateTime;
use tower_sessions::{session::Id, session::Record, session_store, ExpiredDeletion, SessionStore};
use tracing::debug;

use crate::entity::session::SessionRow;
use crate::error::Error;
use crate::session::unix_now;
use crate::SqlStore;

impl From<Error> for session_store::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Encode(e) => session_store::Error::Encode(e.to_string()),
            Error::Decode(e) => session_store::Error::Decode(e.to_string()),
            other => session_store::Error::Backend(other.to_string()),
        }
    }
}

fn encode(record: &Record) -> session_store::Result<Vec<u8>> {
    rmp_serde::to_vec(&record.data).map_err(|e| session_store::Error::Encode(e.to_string()))
}

#[async_trait]
impl SessionStore for SqlStore {
    /// Inserts a new row, regenerating the identifier while it collides with
    /// an existing one.
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        // Session ID collision mitigation
        while self.fetch_row(&record.id.to_string()).await?.is_some() {
            record.id = Id::default();
        }

        let now = unix_now();
        let row = SessionRow {
            id: record.id.to_string(),
            data: encode(record)?,
            created: now,
            modified: now,
            expires: record.expiry_date.unix_timestamp(),
        };
        self.insert_row(&row).await?;
        Ok(())
    }

    /// Updates the row, keeping its creation time, or inserts it when missing.
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let id = record.id.to_string();
        let now = unix_now();
        let data = encode(record)?;
        let expires = record.expiry_date.unix_timestamp();

        match self.fetch_row(&id).await? {
            Some(existing) => {
                let row = SessionRow {
                    id,
                    data,
                    created: existing.created,
                    modified: now,
                    expires,
                };
                self.update_row(&row).await?;
            }
            None => {
                let row = SessionRow {
                    id,
                    data,
                    created: now,
                    modified: now,
                    expires,
                };
                self.insert_row(&row).await?;
            }
        }
        Ok(())
    }

    /// Loads a record. Expired rows read as `None` and are left for the sweeper.
    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let Some(row) = self.fetch_row(&session_id.to_string()).await? else {
            return Ok(None);
        };
        if row.is_expired(unix_now()) {
            debug!(expires = row.expires, "session expired");
            return Ok(None);
        }

        let data = rmp_serde::from_slice(&row.data)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        let expiry_date = OffsetDateTime::from_unix_timestamp(row.expires)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;

        Ok(Some(Record {
            id: *session_id,
            data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.remove(&session_id.to_string()).await?;
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SqlStore {
    /// Runs one sweep pass: expired rows and stale empty rows.
    async fn delete_expired(&self) -> session_store::Result<()> {
        self.sweep().await?;
        Ok(())
    }
}
