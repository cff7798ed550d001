//! Error types shared by every Sortable crate.
//!
//! The taxonomy separates storage failures (`Connection`, `Query`), which are
//! always propagated unchanged, from precondition failures raised by the
//! ordering core itself (`Config`, `NotFound`, `Sort`).

use std::fmt;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type.
#[derive(Debug)]
pub enum Error {
    /// Connecting to or talking with the store failed.
    Connection(ConnectionError),
    /// A statement was rejected or failed while executing.
    Query(QueryError),
    /// The ordering configuration is malformed.
    Config(ConfigError),
    /// A referenced row does not exist in its scope.
    NotFound(NotFoundError),
    /// A reindex request violated an ordering precondition.
    Sort(SortError),
    /// A column value could not be converted to the requested type.
    Type(TypeError),
    /// Free-form error.
    Custom(String),
}

impl Error {
    /// Whether this error came from the storage layer.
    ///
    /// Storage errors are never retried by the ordering core.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Query(_))
    }

    /// Whether this error reports a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// The ordering precondition kind, if this is a `Sort` error.
    pub fn sort_kind(&self) -> Option<SortErrorKind> {
        match self {
            Error::Sort(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Build a configuration error for `field`.
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            field,
            message: message.into(),
        })
    }

    /// Build an ordering precondition error.
    pub fn sort(kind: SortErrorKind, message: impl Into<String>) -> Self {
        Error::Sort(SortError {
            kind,
            message: message.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "connection error: {e}"),
            Error::Query(e) => write!(f, "query error: {e}"),
            Error::Config(e) => write!(f, "configuration error: {e}"),
            Error::NotFound(e) => write!(f, "not found: {e}"),
            Error::Sort(e) => write!(f, "sort error: {e}"),
            Error::Type(e) => write!(f, "type error: {e}"),
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

// ============================================================================
// Storage errors
// ============================================================================

/// What part of the connection lifecycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Opening the connection failed.
    Connect,
    /// The connection was closed or poisoned.
    Closed,
    /// A connection lock could not be acquired.
    Lock,
}

/// A connection-level failure.
#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Classification of statement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The SQL text was invalid (or referenced a missing table/column).
    Syntax,
    /// A constraint (unique, not-null, check, foreign key) was violated.
    Constraint,
    /// The store gave up waiting for a lock.
    Timeout,
    /// The transaction was aborted by a serialization conflict.
    Serialization,
    /// The statement was cancelled.
    Cancelled,
    /// Any other database-reported failure.
    Database,
}

/// A statement-level failure.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    /// The statement that failed, when known.
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// Create a query error without source or SQL.
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Attach the failing statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(sql) = &self.sql {
            write!(f, " (sql: {sql})")?;
        }
        Ok(())
    }
}

// ============================================================================
// Ordering errors
// ============================================================================

/// Malformed ordering configuration, reported when the config is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The configuration key at fault.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.field, self.message)
    }
}

/// A row referenced by id is absent from its table or scope.
#[derive(Debug, Clone, PartialEq)]
pub struct NotFoundError {
    pub table: String,
    /// Rendered primary-key value.
    pub id: String,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no row with id {} in `{}`", self.id, self.table)
    }
}

/// Which ordering precondition was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortErrorKind {
    /// Two entities from different ordering scopes were combined.
    CrossScope,
    /// The scope does not match the table's grouping configuration.
    ScopeMismatch,
    /// The entity has no rank yet.
    Unranked,
    /// Requested ranks do not fit in an `i64`.
    RankOutOfRange,
}

/// An ordering precondition failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortError {
    pub kind: SortErrorKind,
    pub message: String,
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// A value could not be converted to the requested Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    /// Column name, when the value came from a row.
    pub column: Option<String>,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.actual)?;
        if let Some(column) = &self.column {
            write!(f, " in column `{column}`")?;
        }
        Ok(())
    }
}
