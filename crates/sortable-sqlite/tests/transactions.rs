use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use sortable_core::{Connection, Error, Executor, IsolationLevel, TransactionOps, Value};
use sortable_sqlite::SqliteConnection;

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> std::result::Result<T, String> {
    match outcome {
        Outcome::Ok(v) => Ok(v),
        Outcome::Err(e) => Err(format!("unexpected error: {e}")),
        Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
        Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
    }
}

fn setup() -> SqliteConnection {
    let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
    conn.execute_batch(
        "CREATE TABLE items (id INTEGER PRIMARY KEY, rank INTEGER);
         INSERT INTO items (id, rank) VALUES (1, 1), (2, 2);",
    )
    .expect("create items");
    conn
}

async fn rank_of(cx: &Cx, conn: &SqliteConnection, id: i64) -> Option<i64> {
    let row = unwrap_outcome(
        conn.query_one(cx, "SELECT rank FROM items WHERE id = ?1", &[Value::BigInt(id)])
            .await,
    )
    .expect("select rank")?;
    row.get_as::<Option<i64>>(0).expect("integer rank")
}

#[test]
fn sqlite_commit_persists_updates() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = setup();

        let tx = unwrap_outcome(conn.begin(&cx).await).expect("begin");
        let changed = unwrap_outcome(
            tx.execute(
                &cx,
                "UPDATE items SET rank = ?1 WHERE id = ?2",
                &[Value::BigInt(5), Value::BigInt(1)],
            )
            .await,
        )
        .expect("update");
        assert_eq!(changed, 1);
        unwrap_outcome(tx.commit(&cx).await).expect("commit");

        assert_eq!(rank_of(&cx, &conn, 1).await, Some(5));
    });
}

#[test]
fn sqlite_rollback_discards_updates() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = setup();

        let tx = unwrap_outcome(conn.begin_with(&cx, IsolationLevel::Serializable).await)
            .expect("begin");
        unwrap_outcome(tx.execute(&cx, "UPDATE items SET rank = rank + 10", &[]).await)
            .expect("update");
        // Reads inside the transaction see its own writes.
        assert_eq!(rank_of(&cx, &conn, 2).await, Some(12));
        unwrap_outcome(tx.rollback(&cx).await).expect("rollback");

        assert_eq!(rank_of(&cx, &conn, 1).await, Some(1));
        assert_eq!(rank_of(&cx, &conn, 2).await, Some(2));
    });
}

#[test]
fn sqlite_dropped_transaction_rolls_back() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = setup();

        {
            let tx = unwrap_outcome(conn.begin(&cx).await).expect("begin");
            unwrap_outcome(tx.execute(&cx, "DELETE FROM items", &[]).await).expect("delete");
        }

        assert_eq!(rank_of(&cx, &conn, 1).await, Some(1));

        // A new transaction can start after the implicit rollback.
        let tx = unwrap_outcome(conn.begin(&cx).await).expect("begin again");
        unwrap_outcome(tx.commit(&cx).await).expect("commit");
    });
}

#[test]
fn sqlite_query_one_without_rows() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = setup();

        let row = unwrap_outcome(
            conn.query_one(&cx, "SELECT rank FROM items WHERE id = ?1", &[Value::BigInt(99)])
                .await,
        )
        .expect("select");
        assert!(row.is_none());

        let rows = unwrap_outcome(conn.query(&cx, "SELECT id, rank FROM items ORDER BY id", &[]).await)
            .expect("select all");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_named::<i64>("rank").expect("rank"), 2);
    });
}

#[test]
fn sqlite_errors_carry_the_statement() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = setup();

        match conn.execute(&cx, "UPDATE missing SET rank = 1", &[]).await {
            Outcome::Err(Error::Query(e)) => {
                assert_eq!(e.sql.as_deref(), Some("UPDATE missing SET rank = 1"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    });
}
