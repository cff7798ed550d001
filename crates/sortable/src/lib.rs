//! Keep a rank column of a relational table a contiguous `1..N` sequence.
//!
//! `sortable` is the **ordering layer**. A host application marks a table as
//! sortable, implements [`Sortable`] for its model and hands a connection to a
//! [`Reindexer`], which reads and rewrites the rank column.
//!
//! # Role In The Architecture
//!
//! - **Configuration**: [`SortableConfig`] is resolved once into an
//!   [`OrderColumn`]; bad identifiers and conflicting columns fail there.
//! - **Scopes**: a [`Scope`] is either the whole table or one value of the
//!   group column. Ranks are only compared within a scope.
//! - **Storage**: [`RankStore`] renders the handful of statements the
//!   reindexer needs for any [`Dialect`](sortable_core::Dialect) and runs them
//!   on any `Executor`.
//! - **Algorithms**: [`Reindexer`] assigns ranks on creation, renumbers from an
//!   id list, steps entities up and down, swaps them and moves them to either
//!   edge. Multi-row updates run in one transaction.
//! - **Entity methods**: [`SortableExt`] exposes the same operations as
//!   methods on every `Sortable`.
//!
//! # Example
//!
//! ```ignore
//! use sortable::prelude::*;
//!
//! let reindexer = Reindexer::from_config("dummies", SortableConfig::new())?;
//!
//! let mut dummy = Dummy::named("1");
//! reindexer.initialize_on_create(&cx, &conn, &mut dummy).await;
//! // insert `dummy` ...
//!
//! dummy.move_to_start(&cx, &conn, &reindexer).await;
//! let ids: Vec<Value> = (1..=20).rev().map(Value::from).collect();
//! reindexer.set_new_order(&cx, &conn, &Scope::all(), &ids, 1).await;
//! ```

mod macros;

pub mod config;
pub mod ext;
pub mod model;
pub mod reindexer;
pub mod scope;
pub mod store;

pub use config::{DEFAULT_ORDER_COLUMN, DEFAULT_PRIMARY_KEY, OrderColumn, SortableConfig};
pub use ext::SortableExt;
pub use model::{Neighbor, RankEntry, Repositioned, SortDirection, Sortable};
pub use reindexer::Reindexer;
pub use scope::Scope;
pub use store::{RankStore, Statement};

pub use sortable_core::{
    Connection, Cx, Error, Executor, IsolationLevel, Outcome, Result, Row, SortErrorKind,
    TransactionOps, Value,
};

/// Everything needed to make a model sortable and reorder it.
pub mod prelude {
    pub use crate::{
        Connection, Cx, Error, OrderColumn, Outcome, RankEntry, Reindexer, Repositioned, Scope,
        SortDirection, Sortable, SortableConfig, SortableExt, Value,
    };
}
