//! SQLite connection and transaction handles.

// Allow `impl Future` return types in trait methods - intentional for async trait compat
#![allow(clippy::manual_async_fn)]

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use asupersync::{Cx, Outcome};
use rusqlite::types::Value as SqlValue;
use rusqlite::{ErrorCode, params_from_iter};

use sortable_core::connection::{Connection, Executor, IsolationLevel, TransactionOps};
use sortable_core::error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind};
use sortable_core::row::ColumnInfo;
use sortable_core::{Dialect, Error, Row, Value};

/// A SQLite connection.
pub struct SqliteConnection {
    inner: Mutex<rusqlite::Connection>,
    path: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        let conn = rusqlite::Connection::open_in_memory().map_err(|e| connect_error(&e))?;
        Ok(Self {
            inner: Mutex::new(conn),
            path: ":memory:".to_string(),
        })
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path).map_err(|e| connect_error(&e))?;
        Ok(Self {
            inner: Mutex::new(conn),
            path: path.display().to_string(),
        })
    }

    /// Run one or more `;`-separated statements without parameters.
    ///
    /// Intended for schema setup.
    pub fn execute_batch(&self, sql: &str) -> Result<(), Error> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(|e| query_error(e, sql))
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, Error> {
        self.inner.lock().map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Lock,
                message: "SQLite connection mutex poisoned".to_string(),
                source: None,
            })
        })
    }

    fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        tracing::trace!(sql, params = params.len(), "sqlite query");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| query_error(e, sql))?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let columns = Arc::new(ColumnInfo::new(names));
        let width = columns.len();

        let mut rows = stmt
            .query(params_from_iter(bind(params)))
            .map_err(|e| query_error(e, sql))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| query_error(e, sql))? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value: SqlValue = row.get(i).map_err(|e| query_error(e, sql))?;
                values.push(from_sqlite(value));
            }
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn run_execute(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        tracing::trace!(sql, params = params.len(), "sqlite execute");
        let conn = self.lock()?;
        let changed = conn
            .execute(sql, params_from_iter(bind(params)))
            .map_err(|e| query_error(e, sql))?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }
}

impl Executor for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        async move { to_outcome(self.run_query(sql, params)) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        async move { to_outcome(self.run_execute(sql, params)) }
    }
}

impl Connection for SqliteConnection {
    type Tx<'conn>
        = SqliteTransaction<'conn>
    where
        Self: 'conn;

    fn begin_with(
        &self,
        _cx: &Cx,
        isolation: IsolationLevel,
    ) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        async move {
            // SQLite is always serializable; IMMEDIATE takes the write lock up front.
            let sql = match isolation {
                IsolationLevel::Serializable | IsolationLevel::RepeatableRead => "BEGIN IMMEDIATE",
                IsolationLevel::ReadCommitted | IsolationLevel::ReadUncommitted => "BEGIN DEFERRED",
            };
            match self.execute_batch(sql) {
                Ok(()) => {
                    tracing::debug!(?isolation, "sqlite transaction started");
                    Outcome::Ok(SqliteTransaction {
                        conn: self,
                        finished: false,
                    })
                }
                Err(e) => Outcome::Err(e),
            }
        }
    }
}

/// An open SQLite transaction.
///
/// Rolled back on drop unless committed.
pub struct SqliteTransaction<'conn> {
    conn: &'conn SqliteConnection,
    finished: bool,
}

impl std::fmt::Debug for SqliteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl SqliteTransaction<'_> {
    fn finish(&mut self, sql: &str) -> Result<(), Error> {
        self.finished = true;
        self.conn.execute_batch(sql)
    }
}

impl Executor for SqliteTransaction<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        async move { to_outcome(self.conn.run_query(sql, params)) }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        async move { to_outcome(self.conn.run_execute(sql, params)) }
    }
}

impl TransactionOps for SqliteTransaction<'_> {
    fn commit(mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        async move {
            let result = self.finish("COMMIT");
            if result.is_err() {
                // A failed COMMIT leaves the transaction open.
                let _ = self.conn.execute_batch("ROLLBACK");
            }
            to_outcome(result)
        }
    }

    fn rollback(mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        async move { to_outcome(self.finish("ROLLBACK")) }
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("sqlite transaction dropped without commit, rolling back");
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "implicit rollback failed");
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn to_outcome<T>(result: Result<T, Error>) -> Outcome<T, Error> {
    match result {
        Ok(v) => Outcome::Ok(v),
        Err(e) => Outcome::Err(e),
    }
}

fn bind(params: &[Value]) -> Vec<SqlValue> {
    params
        .iter()
        .map(|v| match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::BigInt(i) => SqlValue::Integer(*i),
            Value::Double(f) => SqlValue::Real(*f),
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Bytes(b) => SqlValue::Blob(b.clone()),
        })
        .collect()
}

fn from_sqlite(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::BigInt(i),
        SqlValue::Real(f) => Value::Double(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

fn connect_error(err: &rusqlite::Error) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message: format!("Failed to open SQLite database: {err}"),
        source: None,
    })
}

fn query_error(err: rusqlite::Error, sql: &str) -> Error {
    let message = err.to_string();
    let kind = match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => QueryErrorKind::Constraint,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => QueryErrorKind::Timeout,
        Some(ErrorCode::OperationInterrupted) => QueryErrorKind::Cancelled,
        _ if message.contains("no such") || message.contains("syntax error") => {
            QueryErrorKind::Syntax
        }
        _ => QueryErrorKind::Database,
    };
    Error::Query(QueryError {
        kind,
        message,
        sql: Some(sql.to_string()),
        source: Some(Box::new(err)),
    })
}
