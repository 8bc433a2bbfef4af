#![allow(dead_code)]

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, FromQueryResult,
    Statement,
};
use sessions_sqlstore::entity::session::SessionRow;
use sessions_sqlstore::{KeyPair, Options, SqlStore};
use time::OffsetDateTime;

pub const TABLE: &str = "\"session\"";

/// MessagePack for an empty map.
pub const EMPTY_DATA: &str = "X'80'";

/// MessagePack for `{"a": 1}`.
pub const SOME_DATA: &str = "X'81A16101'";

pub fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

pub async fn connect() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(opt).await.expect("sqlite connects")
}

pub fn options(keys: &KeyPair) -> Options {
    Options::default().with_key_pairs(vec![keys.clone()])
}

/// A store plus a second handle on its connection for direct table access.
pub async fn store(options: Options) -> (SqlStore, DatabaseConnection) {
    let conn = connect().await;
    let store = SqlStore::new(conn.clone(), options)
        .await
        .expect("store builds");
    (store, conn)
}

pub async fn insert_raw(
    conn: &DatabaseConnection,
    id: &str,
    data: &str,
    created: i64,
    expires: i64,
) {
    conn.execute_unprepared(&format!(
        "INSERT INTO {TABLE} (id, data, created, modified, expires) \
         VALUES ('{id}', {data}, {created}, {created}, {expires})"
    ))
    .await
    .expect("raw insert");
}

pub async fn row(conn: &DatabaseConnection, id: &str) -> Option<SessionRow> {
    SessionRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        format!("SELECT id, data, created, modified, expires FROM {TABLE} WHERE id = ?"),
        [id.to_string().into()],
    ))
    .one(conn)
    .await
    .expect("row query")
}

pub async fn count(conn: &DatabaseConnection) -> i64 {
    count_in(conn, TABLE).await
}

pub async fn count_in(conn: &DatabaseConnection, table: &str) -> i64 {
    let res = conn
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .expect("count query")
        .expect("count row");
    res.try_get::<i64>("", "n").expect("count value")
}
