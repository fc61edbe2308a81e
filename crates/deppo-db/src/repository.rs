//! Generic query/execute repository.
//!
//! Every operation follows the same shape: open a connection, run one
//! driver call, close the connection, and report the outcome as an
//! envelope. Connections are never reused across calls.

use std::marker::PhantomData;
use std::sync::Arc;

use deppo_types::{DataResult, OpResult};
use rusqlite::{Batch, Connection, Statement};

use crate::connection::{open_connection, DbSettings};
use crate::params::{FromRow, QueryParams};
use crate::procedures::ProcedureCatalog;
use crate::DbError;

/// Command timeout applied by [`SqlRepository::get_all_async`], in milliseconds.
pub const GET_ALL_COMMAND_TIMEOUT_MS: u64 = 60_000;

/// Repository of entities of type `T` backed by a SQLite database.
pub struct SqlRepository<T> {
    settings: Arc<DbSettings>,
    procedures: ProcedureCatalog,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SqlRepository<T> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            procedures: self.procedures.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for SqlRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRepository")
            .field("connection_string", &self.settings.connection_string)
            .field("procedures", &self.procedures.len())
            .finish()
    }
}

impl<T> SqlRepository<T> {
    /// Creates a repository that opens connections with `settings`.
    ///
    /// No connection is opened here; an unreachable database surfaces as an
    /// error envelope on the first operation.
    pub fn new(settings: DbSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            procedures: ProcedureCatalog::new(),
            _entity: PhantomData,
        }
    }

    /// Attaches the procedure catalog used by the `*_procedure` operations.
    #[must_use]
    pub fn with_procedures(mut self, procedures: ProcedureCatalog) -> Self {
        self.procedures = procedures;
        self
    }

    /// Settings used for every connection.
    pub fn settings(&self) -> &DbSettings {
        &self.settings
    }

    fn with_busy_timeout(&self, busy_timeout_ms: u64) -> Self {
        let mut settings = (*self.settings).clone();
        settings.busy_timeout_ms = settings.busy_timeout_ms.max(busy_timeout_ms);
        Self {
            settings: Arc::new(settings),
            procedures: self.procedures.clone(),
            _entity: PhantomData,
        }
    }

    /// Opens a connection, runs `f`, and closes the connection whatever the
    /// outcome of `f`.
    fn with_connection<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Connection) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        let mut conn = open_connection(&self.settings)?;
        let result = f(&mut conn);
        if let Err((_, e)) = conn.close() {
            tracing::warn!(operation, error = %e, "failed to close database connection");
        }
        result
    }

    /// Runs `script` in a transaction that commits only if every statement
    /// succeeds.
    fn execute_in_transaction(
        &self,
        operation: &'static str,
        script: &str,
        params: &QueryParams,
    ) -> OpResult {
        let result = self.with_connection(operation, |conn| {
            let tx = conn.transaction()?;
            let changed = run_script(&tx, script, params)?;
            tx.commit()?;
            Ok(changed)
        });

        match result {
            Ok(changed) => {
                tracing::debug!(operation, changed, "repository command committed");
                OpResult::success_with_message(format!("{changed} row(s) affected"))
            }
            Err(e) => op_failure(operation, e),
        }
    }

    /// Executes `query` inside a transaction.
    pub fn execute_query(&self, query: &str) -> OpResult {
        self.execute_query_with(query, &QueryParams::new())
    }

    /// Executes `query` with `params` inside a transaction.
    ///
    /// Multi-statement scripts run in order; a failure in any statement rolls
    /// back the whole script.
    pub fn execute_query_with(&self, query: &str, params: &QueryParams) -> OpResult {
        tracing::debug!(operation = "execute_query", query, "running repository command");
        self.execute_in_transaction("execute_query", query, params)
    }

    /// Runs the catalog procedure `name` inside a transaction.
    pub fn execute_procedure(&self, name: &str) -> OpResult {
        self.execute_procedure_with(name, &QueryParams::new())
    }

    /// Runs the catalog procedure `name` with `params` inside a transaction.
    pub fn execute_procedure_with(&self, name: &str, params: &QueryParams) -> OpResult {
        tracing::debug!(operation = "execute_procedure", procedure = name, "running procedure");
        match self.procedures.script(name) {
            Ok(script) => self.execute_in_transaction("execute_procedure", script, params),
            Err(e) => op_failure("execute_procedure", e),
        }
    }

    /// Executes `query` outside any transaction and returns the number of
    /// rows it changed.
    pub fn execute_scalar(&self, query: &str) -> DataResult<usize> {
        tracing::debug!(operation = "execute_scalar", query, "running repository command");
        let result = self.with_connection("execute_scalar", |conn| {
            run_script(conn, query, &QueryParams::new())
        });
        envelope("execute_scalar", result)
    }
}

impl<T: FromRow> SqlRepository<T> {
    /// Returns every row produced by `query`.
    ///
    /// A multi-statement query runs every statement in order, outside any
    /// transaction, and returns the rows of the first statement that produces
    /// columns. `INSERT ...; SELECT last_insert_rowid();` therefore yields the
    /// new row id.
    pub fn get(&self, query: &str, params: &QueryParams) -> DataResult<Vec<T>> {
        tracing::debug!(operation = "get", query, "running repository query");
        let result = self.with_connection("get", |conn| {
            read_script(conn, query, params, ResultSet::First, usize::MAX)
        });
        envelope("get", result)
    }

    /// Returns the first row produced by `query`.
    ///
    /// An empty result is an error envelope.
    pub fn get_by_id(&self, query: &str, params: &QueryParams) -> DataResult<T> {
        tracing::debug!(operation = "get_by_id", query, "running repository query");
        let result = self.with_connection("get_by_id", |conn| {
            read_script(conn, query, params, ResultSet::First, 1)?
                .into_iter()
                .next()
                .ok_or(DbError::Sql(rusqlite::Error::QueryReturnedNoRows))
        });
        envelope("get_by_id", result)
    }

    /// Returns every row produced by the parameterless `query`.
    pub fn get_all(&self, query: &str) -> DataResult<Vec<T>> {
        tracing::debug!(operation = "get_all", query, "running repository query");
        let result = self.with_connection("get_all", |conn| {
            read_script(conn, query, &QueryParams::new(), ResultSet::First, usize::MAX)
        });
        envelope("get_all", result)
    }

    /// Returns the first row produced by `query`, or `None` if there is none.
    pub fn first_or_default(&self, query: &str, params: &QueryParams) -> DataResult<Option<T>> {
        tracing::debug!(operation = "first_or_default", query, "running repository query");
        let result = self.with_connection("first_or_default", |conn| {
            read_script(conn, query, params, ResultSet::First, 1)
        });
        match result {
            Ok(rows) => match rows.into_iter().next() {
                Some(first) => DataResult::success(Some(first)),
                None => DataResult::success_with_message(None, "no matching row"),
            },
            Err(e) => data_failure("first_or_default", e),
        }
    }

    /// Runs the catalog procedure `name` and returns the rows of its last
    /// row-returning statement.
    pub fn get_with_procedure(&self, name: &str, params: &QueryParams) -> DataResult<Vec<T>> {
        tracing::debug!(operation = "get_with_procedure", procedure = name, "running procedure");
        let result = self.procedures.script(name).and_then(|script| {
            self.with_connection("get_with_procedure", |conn| {
                read_script(conn, script, params, ResultSet::Last, usize::MAX)
            })
        });
        envelope("get_with_procedure", result)
    }
}

impl<T: FromRow + Send + 'static> SqlRepository<T> {
    /// Async form of [`SqlRepository::get`].
    pub async fn get_async(&self, query: impl Into<String>, params: QueryParams) -> DataResult<Vec<T>> {
        let repo = self.clone();
        let query = query.into();
        offload(move || repo.get(&query, &params))
            .await
            .unwrap_or_else(|e| data_failure("get", e))
    }

    /// Async form of [`SqlRepository::get_by_id`].
    pub async fn get_by_id_async(&self, query: impl Into<String>, params: QueryParams) -> DataResult<T> {
        let repo = self.clone();
        let query = query.into();
        offload(move || repo.get_by_id(&query, &params))
            .await
            .unwrap_or_else(|e| data_failure("get_by_id", e))
    }

    /// Async form of [`SqlRepository::get_all`], run with a busy timeout of at
    /// least [`GET_ALL_COMMAND_TIMEOUT_MS`].
    pub async fn get_all_async(&self, query: impl Into<String>) -> DataResult<Vec<T>> {
        let repo = self.with_busy_timeout(GET_ALL_COMMAND_TIMEOUT_MS);
        let query = query.into();
        offload(move || repo.get_all(&query))
            .await
            .unwrap_or_else(|e| data_failure("get_all", e))
    }

    /// Async form of [`SqlRepository::first_or_default`].
    pub async fn first_or_default_async(
        &self,
        query: impl Into<String>,
        params: QueryParams,
    ) -> DataResult<Option<T>> {
        let repo = self.clone();
        let query = query.into();
        offload(move || repo.first_or_default(&query, &params))
            .await
            .unwrap_or_else(|e| data_failure("first_or_default", e))
    }

    /// Async form of [`SqlRepository::get_with_procedure`].
    pub async fn get_with_procedure_async(
        &self,
        name: impl Into<String>,
        params: QueryParams,
    ) -> DataResult<Vec<T>> {
        let repo = self.clone();
        let name = name.into();
        offload(move || repo.get_with_procedure(&name, &params))
            .await
            .unwrap_or_else(|e| data_failure("get_with_procedure", e))
    }
}

impl<T: 'static> SqlRepository<T> {
    /// Async form of [`SqlRepository::execute_query`].
    pub async fn execute_query_async(&self, query: impl Into<String>) -> OpResult {
        self.execute_query_with_async(query, QueryParams::new()).await
    }

    /// Async form of [`SqlRepository::execute_query_with`].
    pub async fn execute_query_with_async(
        &self,
        query: impl Into<String>,
        params: QueryParams,
    ) -> OpResult {
        let repo = self.clone();
        let query = query.into();
        offload(move || repo.execute_query_with(&query, &params))
            .await
            .unwrap_or_else(|e| op_failure("execute_query", e))
    }

    /// Async form of [`SqlRepository::execute_procedure`].
    pub async fn execute_procedure_async(&self, name: impl Into<String>) -> OpResult {
        self.execute_procedure_with_async(name, QueryParams::new()).await
    }

    /// Async form of [`SqlRepository::execute_procedure_with`].
    pub async fn execute_procedure_with_async(
        &self,
        name: impl Into<String>,
        params: QueryParams,
    ) -> OpResult {
        let repo = self.clone();
        let name = name.into();
        offload(move || repo.execute_procedure_with(&name, &params))
            .await
            .unwrap_or_else(|e| op_failure("execute_procedure", e))
    }

    /// Async form of [`SqlRepository::execute_scalar`].
    pub async fn execute_scalar_async(&self, query: impl Into<String>) -> DataResult<usize> {
        let repo = self.clone();
        let query = query.into();
        offload(move || repo.execute_scalar(&query))
            .await
            .unwrap_or_else(|e| data_failure("execute_scalar", e))
    }
}

/// Runs a blocking driver call on tokio's blocking pool.
async fn offload<R, F>(f: F) -> Result<R, DbError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

fn envelope<R>(operation: &'static str, result: Result<R, DbError>) -> DataResult<R> {
    match result {
        Ok(data) => DataResult::success(data),
        Err(e) => data_failure(operation, e),
    }
}

fn data_failure<R>(operation: &'static str, error: DbError) -> DataResult<R> {
    tracing::warn!(operation, error = %error, "repository operation failed");
    DataResult::error(error.to_string())
}

fn op_failure(operation: &'static str, error: DbError) -> OpResult {
    tracing::warn!(operation, error = %error, "repository operation failed");
    OpResult::error(error.to_string())
}

/// Which result set a multi-statement read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultSet {
    First,
    Last,
}

/// Runs every statement of `script` in order and returns up to `limit` rows
/// of the chosen row-returning statement. Statements without columns run for
/// their side effects; any other result set is drained and discarded.
fn read_script<T: FromRow>(
    conn: &Connection,
    script: &str,
    params: &QueryParams,
    keep: ResultSet,
    limit: usize,
) -> Result<Vec<T>, DbError> {
    let mut batch = Batch::new(conn, script);
    let mut kept: Option<Vec<T>> = None;
    let mut statements = 0_usize;
    while let Some(mut stmt) = batch.next()? {
        statements += 1;
        params.bind_to(&mut stmt)?;
        if stmt.column_count() == 0 {
            stmt.raw_execute()?;
        } else if keep == ResultSet::Last || kept.is_none() {
            kept = Some(collect_rows(&mut stmt, limit)?);
        } else {
            drain(&mut stmt)?;
        }
    }
    if statements == 0 {
        return Err(DbError::EmptyQuery);
    }
    Ok(kept.unwrap_or_default())
}

fn collect_rows<T: FromRow>(stmt: &mut Statement<'_>, limit: usize) -> Result<Vec<T>, DbError> {
    let mut rows = stmt.raw_query();
    let mut out = Vec::new();
    while out.len() < limit {
        match rows.next()? {
            Some(row) => out.push(T::from_row(row)?),
            None => break,
        }
    }
    Ok(out)
}

fn drain(stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
    let mut rows = stmt.raw_query();
    while rows.next()?.is_some() {}
    Ok(())
}

/// Runs every statement of `script`, discarding any rows, and returns the
/// total number of changed rows.
fn run_script(conn: &Connection, script: &str, params: &QueryParams) -> Result<usize, DbError> {
    let before = total_changes(conn)?;
    let mut batch = Batch::new(conn, script);
    let mut statements = 0_usize;
    while let Some(mut stmt) = batch.next()? {
        statements += 1;
        params.bind_to(&mut stmt)?;
        if stmt.column_count() > 0 {
            drain(&mut stmt)?;
        } else {
            stmt.raw_execute()?;
        }
    }
    if statements == 0 {
        return Err(DbError::EmptyQuery);
    }
    let after = total_changes(conn)?;
    Ok(usize::try_from(after - before).unwrap_or(0))
}

// `changes()` keeps the last DML count across DDL statements, so scripts are
// measured with the connection-wide counter instead.
fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
}
