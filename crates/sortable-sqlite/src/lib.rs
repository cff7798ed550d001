//! SQLite driver for Sortable Rust.
//!
//! Implements `sortable-core`'s [`Connection`](sortable_core::Connection) on top
//! of `rusqlite` with a bundled SQLite. Statements run synchronously while the
//! connection lock is held; the returned futures complete without suspending.
//!
//! # Example
//!
//! ```rust,ignore
//! use sortable_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_batch("CREATE TABLE dummies (id INTEGER PRIMARY KEY, order_column INTEGER)")?;
//! ```

pub mod connection;

pub use connection::{SqliteConnection, SqliteTransaction};
