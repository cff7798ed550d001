//! Shared fixtures for the SQLite-backed ordering tests.

#![allow(dead_code)]

use std::future::Future;

use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use sortable::prelude::*;
use sortable::{Executor, Row};
use sortable_sqlite::SqliteConnection;

pub const SCHEMA: &str = "CREATE TABLE dummies (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    order_column INTEGER,
    list_id INTEGER
)";

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> std::result::Result<T, String> {
    match outcome {
        Outcome::Ok(v) => Ok(v),
        Outcome::Err(e) => Err(format!("unexpected error: {e}")),
        Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
        Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
    }
}

pub fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        other => panic!("expected an error, got {other:?}"),
    }
}

pub fn block_on<F: Future<Output = ()>>(future: F) {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(future);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dummy {
    pub id: i64,
    pub name: String,
    pub order_column: Option<i64>,
    pub list_id: Option<i64>,
}

impl Dummy {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            order_column: None,
            list_id: None,
        }
    }

    pub fn in_list(mut self, list_id: i64) -> Self {
        self.list_id = Some(list_id);
        self
    }

    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_named("id").expect("id column"),
            name: row.get_named("name").expect("name column"),
            order_column: row.get_named("order_column").expect("order_column column"),
            list_id: row.get_named("list_id").expect("list_id column"),
        }
    }
}

impl Sortable for Dummy {
    fn sort_key(&self) -> Value {
        Value::BigInt(self.id)
    }

    fn rank(&self) -> Option<i64> {
        self.order_column
    }

    fn set_rank(&mut self, rank: i64) {
        self.order_column = Some(rank);
    }

    fn group_key(&self) -> Option<Value> {
        self.list_id.map(Value::BigInt)
    }
}

pub fn open() -> SqliteConnection {
    let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
    conn.execute_batch(SCHEMA).expect("create dummies table");
    conn
}

/// Rank the dummy as a creation hook would, then insert it.
pub async fn create(cx: &Cx, conn: &SqliteConnection, reindexer: &Reindexer, dummy: &mut Dummy) {
    unwrap_outcome(reindexer.initialize_on_create(cx, conn, dummy).await)
        .expect("initialize on create");
    insert(cx, conn, dummy).await;
}

pub async fn insert(cx: &Cx, conn: &SqliteConnection, dummy: &Dummy) {
    let params = [
        Value::BigInt(dummy.id),
        Value::from(dummy.name.as_str()),
        Value::from(dummy.order_column),
        Value::from(dummy.list_id),
    ];
    unwrap_outcome(
        conn.execute(
            cx,
            "INSERT INTO dummies (id, name, order_column, list_id) VALUES (?1, ?2, ?3, ?4)",
            &params,
        )
        .await,
    )
    .expect("insert dummy");
}

/// Twenty dummies with ids and names `1..=20`, created in that order.
pub async fn seed(cx: &Cx, conn: &SqliteConnection, reindexer: &Reindexer) -> Vec<Dummy> {
    let mut dummies = Vec::new();
    for i in 1..=20 {
        let mut dummy = Dummy::new(i, i.to_string());
        create(cx, conn, reindexer, &mut dummy).await;
        dummies.push(dummy);
    }
    dummies
}

pub async fn load(cx: &Cx, conn: &SqliteConnection, id: i64) -> Dummy {
    let row = unwrap_outcome(
        conn.query_one(cx, "SELECT * FROM dummies WHERE id = ?1", &[Value::BigInt(id)])
            .await,
    )
    .expect("select dummy")
    .expect("dummy exists");
    Dummy::from_row(&row)
}

pub async fn load_all(cx: &Cx, conn: &SqliteConnection) -> Vec<Dummy> {
    let rows = unwrap_outcome(conn.query(cx, "SELECT * FROM dummies ORDER BY id", &[]).await)
        .expect("select dummies");
    rows.iter().map(Dummy::from_row).collect()
}

/// Ids of a scope in rank order.
pub async fn ordered_ids(
    cx: &Cx,
    conn: &SqliteConnection,
    reindexer: &Reindexer,
    scope: &Scope,
) -> Vec<i64> {
    unwrap_outcome(reindexer.ordered_sequence(cx, conn, scope).await)
        .expect("ordered sequence")
        .into_iter()
        .map(|entry| entry.id.as_i64().expect("integer id"))
        .collect()
}

/// Assert the scope's ranks are exactly `1..=n`.
pub async fn assert_contiguous(
    cx: &Cx,
    conn: &SqliteConnection,
    reindexer: &Reindexer,
    scope: &Scope,
) {
    let entries = unwrap_outcome(reindexer.ordered_sequence(cx, conn, scope).await)
        .expect("ordered sequence");
    let ranks: Vec<i64> = entries
        .iter()
        .map(|entry| entry.rank.expect("ranked row"))
        .collect();
    let expected: Vec<i64> = (1..=ranks.len() as i64).collect();
    assert_eq!(ranks, expected, "ranks of {scope} are not contiguous");
}
