//! Core types and traits for Sortable Rust.
//!
//! `sortable-core` is the **contract layer** shared by the ordering core and the
//! database drivers.
//!
//! # Role In The Architecture
//!
//! - **Storage contract**: `Connection`, `TransactionOps` and `Executor` are the
//!   narrow interface the reindexer talks to. Drivers implement them.
//! - **Data model**: `Row` and `Value` carry statement parameters and results.
//! - **Dialects**: `Dialect` renders placeholders and quoted identifiers so the
//!   same statements work on PostgreSQL, SQLite and MySQL.
//! - **Errors**: `Error` is the single error type crossing every crate boundary.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so
//!   every storage call is cancel-correct.
//!
//! Most applications should use the `sortable` crate; reach for `sortable-core`
//! directly when writing a driver.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod dialect;
pub mod error;
pub mod row;
pub mod value;

pub use connection::{Connection, Executor, IsolationLevel, TransactionOps};
pub use dialect::Dialect;
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, NotFoundError, QueryError,
    QueryErrorKind, Result, SortError, SortErrorKind, TypeError,
};
pub use row::{ColumnInfo, Row};
pub use value::{FromValue, Value};
