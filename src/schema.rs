//! Table naming, DDL and the SQL statements the store issues.

use sea_orm::{DbBackend, Statement, Value};

use crate::options::DEFAULT_TABLE;

/// Placeholder in DDL templates replaced with the quoted table name.
pub const TABLE_PLACEHOLDER: &str = "{table}";

const POSTGRES_DDL: &str = "CREATE TABLE IF NOT EXISTS {table} (\
id VARCHAR(64) NOT NULL PRIMARY KEY, \
data BYTEA NOT NULL, \
created BIGINT NOT NULL, \
modified BIGINT NOT NULL, \
expires BIGINT NOT NULL)";

const MYSQL_DDL: &str = "CREATE TABLE IF NOT EXISTS {table} (\
id VARCHAR(64) NOT NULL PRIMARY KEY, \
data LONGBLOB NOT NULL, \
created BIGINT NOT NULL, \
modified BIGINT NOT NULL, \
expires BIGINT NOT NULL\
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

const SQLITE_DDL: &str = "CREATE TABLE IF NOT EXISTS {table} (\
id TEXT NOT NULL PRIMARY KEY, \
data BLOB NOT NULL, \
created INTEGER NOT NULL, \
modified INTEGER NOT NULL, \
expires INTEGER NOT NULL)";

/// Default DDL template for a backend.
pub fn default_ddl(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => POSTGRES_DDL,
        DbBackend::MySql => MYSQL_DDL,
        _ => SQLITE_DDL,
    }
}

/// Substitutes the quoted table name into a DDL template.
pub fn render_ddl(template: &str, quoted_table: &str) -> String {
    template.replace(TABLE_PLACEHOLDER, quoted_table)
}

/// Strips quoting from a configured table name and re-quotes it for `backend`.
///
/// A dotted name is treated as `schema.table` and quoted per segment.
/// Falls back to [`DEFAULT_TABLE`] when nothing is left after stripping.
pub fn quote_table(backend: DbBackend, raw: &str) -> String {
    let quote = match backend {
        DbBackend::MySql => '`',
        _ => '"',
    };
    let segments: Vec<String> = raw
        .split('.')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| !matches!(c, '`' | '"' | '[' | ']') && !c.is_whitespace())
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return format!("{quote}{DEFAULT_TABLE}{quote}");
    }
    segments
        .iter()
        .map(|segment| format!("{quote}{segment}{quote}"))
        .collect::<Vec<_>>()
        .join(".")
}

/// The statement texts for one table, rendered once for the backend.
#[derive(Debug, Clone)]
pub(crate) struct Statements {
    pub backend: DbBackend,
    pub table: String,
    pub insert: String,
    pub delete: String,
    pub update: String,
    pub select: String,
    pub gc_expired: String,
    pub gc_empty: String,
}

impl Statements {
    /// Renders every statement against an already quoted table name.
    ///
    /// `empty_size` is the serialized size of an empty value map.
    pub fn new(backend: DbBackend, table: String, empty_size: usize) -> Self {
        let p = |n: usize| placeholder(backend, n);

        let insert = match backend {
            DbBackend::Postgres => format!(
                "INSERT INTO {table} (id, data, created, modified, expires) \
                 VALUES ({}, {}, {}, {}, {}) \
                 ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, \
                 created = EXCLUDED.created, modified = EXCLUDED.modified, \
                 expires = EXCLUDED.expires",
                p(1),
                p(2),
                p(3),
                p(4),
                p(5)
            ),
            DbBackend::MySql => format!(
                "REPLACE INTO {table} (id, data, created, modified, expires) \
                 VALUES (?, ?, ?, ?, ?)"
            ),
            _ => format!(
                "INSERT OR REPLACE INTO {table} (id, data, created, modified, expires) \
                 VALUES (?, ?, ?, ?, ?)"
            ),
        };
        let delete = format!("DELETE FROM {table} WHERE id = {}", p(1));
        let update = format!(
            "UPDATE {table} SET data = {}, created = {}, modified = {}, expires = {} WHERE id = {}",
            p(1),
            p(2),
            p(3),
            p(4),
            p(5)
        );
        let select = format!(
            "SELECT id, data, created, modified, expires FROM {table} WHERE id = {}",
            p(1)
        );
        let gc_expired = format!("DELETE FROM {table} WHERE expires < {}", p(1));
        let length = match backend {
            DbBackend::Postgres => "octet_length",
            DbBackend::MySql => "LENGTH",
            _ => "length",
        };
        let gc_empty = format!(
            "DELETE FROM {table} WHERE {length}(data) = {empty_size} AND created < {}",
            p(1)
        );

        Self {
            backend,
            table,
            insert,
            delete,
            update,
            select,
            gc_expired,
            gc_empty,
        }
    }

    /// Binds `values` to one of the statement texts.
    pub fn bind<I>(&self, sql: &str, values: I) -> Statement
    where
        I: IntoIterator<Item = Value>,
    {
        Statement::from_sql_and_values(self.backend, sql, values)
    }
}

fn placeholder(backend: DbBackend, n: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${n}"),
        _ => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_strips_and_requotes() {
        assert_eq!(quote_table(DbBackend::MySql, "`session`"), "`session`");
        assert_eq!(
            quote_table(DbBackend::Postgres, "app.\"web sessions\""),
            "\"app\".\"websessions\""
        );
        assert_eq!(
            quote_table(DbBackend::Sqlite, "x\"; DROP TABLE y; --"),
            "\"x;DROPTABLEy;--\""
        );
        assert_eq!(quote_table(DbBackend::Sqlite, " `` "), "\"session\"");
        assert_eq!(quote_table(DbBackend::MySql, ""), "`session`");
    }

    #[test]
    fn ddl_template_substitution() {
        let ddl = render_ddl(default_ddl(DbBackend::Sqlite), "\"session\"");
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"session\" ("));
        assert!(!ddl.contains(TABLE_PLACEHOLDER));
    }

    #[test]
    fn postgres_statements_use_numbered_placeholders() {
        let stmts = Statements::new(DbBackend::Postgres, "\"session\"".into(), 1);
        assert_eq!(
            stmts.update,
            "UPDATE \"session\" SET data = $1, created = $2, modified = $3, expires = $4 WHERE id = $5"
        );
        assert!(stmts.insert.contains("ON CONFLICT (id) DO UPDATE"));
        assert_eq!(
            stmts.gc_empty,
            "DELETE FROM \"session\" WHERE octet_length(data) = 1 AND created < $1"
        );
    }

    #[test]
    fn mysql_uses_replace() {
        let stmts = Statements::new(DbBackend::MySql, "`session`".into(), 1);
        assert!(stmts.insert.starts_with("REPLACE INTO `session`"));
        assert_eq!(stmts.delete, "DELETE FROM `session` WHERE id = ?");
        assert_eq!(stmts.gc_expired, "DELETE FROM `session` WHERE expires < ?");
    }
}
