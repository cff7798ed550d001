//! The storage contract implemented by database drivers.
//!
//! Statements are executed through [`Executor`], which both a [`Connection`]
//! and an open transaction ([`TransactionOps`]) implement. Code that only
//! needs to read or update rows is written once against `Executor` and runs
//! unchanged inside or outside a transaction.

use std::future::Future;

use asupersync::{Cx, Outcome};

use crate::dialect::Dialect;
use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling used in `SET TRANSACTION ISOLATION LEVEL`.
    pub const fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Anything that can run parameterized statements.
pub trait Executor: Send + Sync {
    /// Dialect used to render placeholders and identifiers.
    fn dialect(&self) -> Dialect;

    /// Run a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a query and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        async move {
            self.query(cx, sql, params)
                .await
                .map(|rows| rows.into_iter().next())
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;
}

/// Operations on an open transaction.
///
/// Dropping a transaction without calling [`commit`](TransactionOps::commit)
/// must roll it back.
pub trait TransactionOps: Executor {
    /// Commit the transaction.
    fn commit(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Roll back the transaction.
    fn rollback(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;
}

/// A database connection.
pub trait Connection: Executor {
    /// Transaction handle borrowed from this connection.
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// Begin a transaction with the driver's default isolation.
    fn begin(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        self.begin_with(cx, IsolationLevel::default())
    }

    /// Begin a transaction with an explicit isolation level.
    fn begin_with(
        &self,
        cx: &Cx,
        isolation: IsolationLevel,
    ) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_sql() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
    }
}
