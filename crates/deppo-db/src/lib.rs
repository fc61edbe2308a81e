//! Data-access layer for the deppo backend.
//!
//! Provides a generic repository over SQLite that wraps single driver calls
//! and reports their outcome as [`deppo_types::OpResult`] or
//! [`deppo_types::DataResult`] envelopes.
//!
//! # Design decisions
//!
//! - **Connection per call**: every operation opens its own connection and
//!   closes it before returning. There is no pool and no statement cache.
//! - **Envelopes, not errors**: driver failures are caught and rendered into
//!   the envelope message verbatim. Callers branch on `success`.
//! - **Transactions for commands**: `execute_*` operations run inside a
//!   transaction that commits only when every statement succeeds.
//! - **Reads take the first result set**: a multi-statement query runs every
//!   statement and returns the rows of the first one that produces columns.
//! - **Procedure catalog**: SQLite has no stored procedures, so procedures
//!   are named SQL scripts registered with the repository.

mod connection;
mod error;
mod params;
mod procedures;
mod repository;

pub use connection::{open_connection, DbSettings, DEFAULT_BUSY_TIMEOUT_MS};
pub use error::DbError;
pub use params::{FromRow, QueryParams};
pub use procedures::ProcedureCatalog;
pub use repository::{SqlRepository, GET_ALL_COMMAND_TIMEOUT_MS};

pub use rusqlite::types::Value;
pub use rusqlite::Row;
