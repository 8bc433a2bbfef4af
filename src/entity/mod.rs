//! Row models for the session table.
//!
//! The table name is chosen at runtime, so rows are read with
//! [`FromQueryResult`](sea_orm::FromQueryResult) over raw statements rather
//! than through a static `Entity`.

/// The session row.
pub mod session;
