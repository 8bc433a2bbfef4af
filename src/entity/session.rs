//! Session row model.

use sea_orm::FromQueryResult;

/// One persisted session.
///
/// # Database Schema
///
/// | Column   | Type               | Description                              |
/// |----------|--------------------|------------------------------------------|
/// | id       | TEXT (Primary Key) | Random 32 bytes, base32 without padding  |
/// | data     | BYTEA / BLOB       | MessagePack serialized session values    |
/// | created  | BIGINT             | Unix seconds, fixed at first insert      |
/// | modified | BIGINT             | Unix seconds of the last save            |
/// | expires  | BIGINT             | Unix seconds the session expires at      |
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult)]
pub struct SessionRow {
    /// Session identifier.
    pub id: String,
    /// Serialized session values, without metadata.
    pub data: Vec<u8>,
    /// Creation time.
    pub created: i64,
    /// Last save time.
    pub modified: i64,
    /// Expiry time.
    pub expires: i64,
}

impl SessionRow {
    /// Whether the row is past its expiry at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires < now
    }
}
