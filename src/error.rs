//! Error types for the SQL session store.

use sea_orm::DbErr;

use crate::codec::CodecError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by [`SqlStore`](crate::SqlStore) operations.
///
/// Only the load path distinguishes [`Error::NotFound`] from
/// [`Error::Expired`]; `new_session` and `reload` absorb both and hand back a
/// fresh session instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The table DDL failed. Construction is aborted.
    #[error("failed to execute `{statement}`: {source}")]
    Ddl {
        /// The statement text that was executed.
        statement: String,
        #[source]
        source: DbErr,
    },

    /// A row statement could not be prepared. Construction is aborted.
    #[error("failed to prepare `{statement}`: {source}")]
    Prepare {
        /// The statement text that was rejected.
        statement: String,
        #[source]
        source: DbErr,
    },

    /// No row exists for the session identifier.
    #[error("session not found")]
    NotFound,

    /// The row exists but its `expires` timestamp is in the past.
    #[error("session expired at {expires}")]
    Expired {
        /// Unix timestamp the row expired at.
        expires: i64,
    },

    /// The session cookie failed authentication, or could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Session values could not be serialized.
    #[error("failed to encode session data: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The stored payload could not be deserialized.
    #[error("failed to decode session data: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A reserved metadata key held something other than an integer timestamp.
    #[error("reserved session key `{0}` must hold an integer unix timestamp")]
    Metadata(String),

    /// Any other database failure.
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl Error {
    /// Whether this is a not-found or expired condition, which the fetch
    /// paths treat as "no session".
    pub fn is_absorbable(&self) -> bool {
        matches!(self, Error::NotFound | Error::Expired { .. })
    }
}
