//! The in-memory session handed to request handlers.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Application data carried by a session.
pub type Values = HashMap<String, Value>;

/// Current time as unix seconds.
pub(crate) fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Row bookkeeping for a session, kept apart from the application values.
///
/// All fields are unix timestamps in seconds and are `None` until the session
/// has been loaded from or written to the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionMeta {
    /// Set on first insert and never changed afterwards.
    pub created: Option<i64>,
    /// Time of the last save.
    pub modified: Option<i64>,
    /// Absolute expiry. Never decreases across saves.
    pub expires: Option<i64>,
}

impl SessionMeta {
    /// Expiry as a date, if known and representable.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
    }
}

/// A session bound to a cookie name.
///
/// A session with an empty [`id`](Self::id) has never been persisted; the
/// first save assigns one and it is fixed from then on.
#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    pub(crate) id: String,
    pub(crate) is_new: bool,
    pub(crate) meta: SessionMeta,
    /// Application values.
    pub values: Values,
}

impl Session {
    /// Creates an empty, new session for the cookie `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            is_new: true,
            meta: SessionMeta::default(),
            values: Values::new(),
        }
    }

    /// Creates a new session with an externally supplied identifier.
    ///
    /// The session is still flagged new, so its first save inserts.
    pub fn with_id(name: impl Into<String>, id: impl Into<String>) -> Self {
        let mut session = Self::new(name);
        session.id = id.into();
        session
    }

    /// Cookie name the session is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage identifier, empty until first saved.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the session was not loaded from storage.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Row bookkeeping.
    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    /// Stores a serializable value under `key`, returning the previous one.
    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<Option<Value>, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.values.insert(key.into(), value))
    }

    /// Reads the value under `key` as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.values
            .get(key)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}
