//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::codec::KeyPair;

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "session";

/// Prefix for reserved metadata keys when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "_";

/// Session lifetime used when neither the request nor the store sets one (30 days).
pub const DEFAULT_MAX_AGE: i64 = 86400 * 30;

/// Age after which rows holding an empty payload are swept (30 minutes).
pub const DEFAULT_EMPTY_DATA_AGE: i64 = 1800;

/// Configuration for [`SqlStore`](crate::SqlStore).
///
/// Deserializes from camelCase keys with every field optional. Key pairs are
/// never read from configuration files; set them with
/// [`with_key_pairs`](Self::with_key_pairs).
///
/// ```
/// use sessions_sqlstore::{KeyPair, Options};
///
/// let options = Options::default()
///     .with_table("app_sessions")
///     .with_max_age(3600)
///     .with_key_pairs(vec![KeyPair::generate()]);
/// assert_eq!(options.table, "app_sessions");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Table name. Quote characters are stripped; empty means [`DEFAULT_TABLE`].
    pub table: String,
    /// Namespace for the reserved `created`/`modified`/`expires` keys.
    pub key_prefix: String,
    /// Cookie authentication/encryption keys, newest first.
    #[serde(skip)]
    pub key_pairs: Vec<KeyPair>,
    /// Session lifetime in seconds. Non-positive means [`DEFAULT_MAX_AGE`].
    pub max_age: i64,
    /// Seconds before an empty session row is swept. Non-positive means
    /// [`DEFAULT_EMPTY_DATA_AGE`].
    pub empty_data_age: i64,
    /// Maximum encoded cookie length. `0` keeps the codec default.
    pub max_length: usize,
    /// Sweep interval. Zero means [`DEFAULT_INTERVAL`](crate::sweeper::DEFAULT_INTERVAL).
    #[serde(deserialize_with = "duration_from_secs")]
    pub check_interval: Duration,
    /// Accepted for the connection layer; the store itself does not reconnect.
    pub max_reconnect: u32,
    /// DDL template creating the table; `{table}` is replaced with the quoted
    /// table name. `None` uses a default for the connection's backend.
    pub ddl: Option<String>,
}

impl Options {
    /// Sets the table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the reserved key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the cookie key pairs.
    pub fn with_key_pairs(mut self, pairs: Vec<KeyPair>) -> Self {
        self.key_pairs = pairs;
        self
    }

    /// Sets the session lifetime in seconds.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Sets the empty-row sweep threshold in seconds.
    pub fn with_empty_data_age(mut self, seconds: i64) -> Self {
        self.empty_data_age = seconds;
        self
    }

    /// Sets the maximum encoded cookie length.
    pub fn with_max_length(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    /// Sets the sweep interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the DDL template.
    pub fn with_ddl(mut self, ddl: impl Into<String>) -> Self {
        self.ddl = Some(ddl.into());
        self
    }

    pub(crate) fn resolved_key_prefix(&self) -> &str {
        if self.key_prefix.is_empty() {
            DEFAULT_KEY_PREFIX
        } else {
            &self.key_prefix
        }
    }

    pub(crate) fn resolved_empty_data_age(&self) -> i64 {
        if self.empty_data_age <= 0 {
            DEFAULT_EMPTY_DATA_AGE
        } else {
            self.empty_data_age
        }
    }
}

fn duration_from_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case() {
        let options: Options = serde_json::from_str(
            r#"{"table":"web_sessions","keyPrefix":"__","maxAge":60,"emptyDataAge":5,"checkInterval":30}"#,
        )
        .unwrap();
        assert_eq!(options.table, "web_sessions");
        assert_eq!(options.resolved_key_prefix(), "__");
        assert_eq!(options.max_age, 60);
        assert_eq!(options.resolved_empty_data_age(), 5);
        assert_eq!(options.check_interval, Duration::from_secs(30));
        assert!(options.key_pairs.is_empty());
        assert!(options.ddl.is_none());
    }

    #[test]
    fn defaults_fill_gaps() {
        let options = Options::default().with_empty_data_age(-1);
        assert_eq!(options.resolved_key_prefix(), DEFAULT_KEY_PREFIX);
        assert_eq!(options.resolved_empty_data_age(), DEFAULT_EMPTY_DATA_AGE);
    }
}
