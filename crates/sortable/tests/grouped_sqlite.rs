//! Ordering within groups of a table partitioned by `list_id`.

mod common;

use asupersync::Cx;

use sortable::prelude::*;
use sortable::SortErrorKind;

use common::{
    Dummy, assert_contiguous, block_on, create, expect_err, load, open, ordered_ids,
    unwrap_outcome,
};

fn reindexer() -> Reindexer {
    Reindexer::from_config(
        "dummies",
        SortableConfig::new().group_column_name("list_id"),
    )
    .expect("valid reindexer")
}

/// Ids 1..=5 in list 1, ids 6..=10 in list 2.
async fn seed_lists(cx: &Cx, conn: &sortable_sqlite::SqliteConnection, reindexer: &Reindexer) {
    for id in 1..=10 {
        let list = if id <= 5 { 1 } else { 2 };
        let mut dummy = Dummy::new(id, id.to_string()).in_list(list);
        create(cx, conn, reindexer, &mut dummy).await;
    }
}

#[test]
fn creation_ranks_are_counted_per_group() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        assert_eq!(load(&cx, &conn, 5).await.order_column, Some(5));
        assert_eq!(load(&cx, &conn, 6).await.order_column, Some(1));
        assert_eq!(load(&cx, &conn, 10).await.order_column, Some(5));

        let highest =
            unwrap_outcome(reindexer.highest_rank(&cx, &conn, &Scope::group(2_i64)).await)
                .unwrap();
        assert_eq!(highest, 5);
        let empty =
            unwrap_outcome(reindexer.highest_rank(&cx, &conn, &Scope::group(3_i64)).await)
                .unwrap();
        assert_eq!(empty, 0);
    });
}

#[test]
fn ordered_sequence_is_limited_to_the_group() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        let list = ordered_ids(&cx, &conn, &reindexer, &Scope::group(2_i64)).await;
        assert_eq!(list, vec![6, 7, 8, 9, 10]);

        let entries =
            unwrap_outcome(reindexer.ordered_sequence(&cx, &conn, &Scope::group(1_i64)).await)
                .unwrap();
        assert!(
            entries
                .iter()
                .all(|e| e.group_key() == Some(Value::BigInt(1)))
        );
    });
}

#[test]
fn set_new_order_leaves_other_groups_alone() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        // Id 7 belongs to list 2 and is ignored.
        let ids: Vec<Value> = [5, 4, 7, 3, 2, 1].into_iter().map(Value::BigInt).collect();
        let updated = unwrap_outcome(
            reindexer
                .set_new_order_from_one(&cx, &conn, &Scope::group(1_i64), &ids)
                .await,
        )
        .unwrap();
        assert_eq!(updated, 5);

        assert_eq!(
            ordered_ids(&cx, &conn, &reindexer, &Scope::group(1_i64)).await,
            vec![5, 4, 3, 2, 1]
        );
        assert_eq!(load(&cx, &conn, 5).await.order_column, Some(1));
        assert_eq!(load(&cx, &conn, 1).await.order_column, Some(6));
        assert_eq!(load(&cx, &conn, 7).await.order_column, Some(2));
    });
}

#[test]
fn moves_stay_inside_the_group() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        // Last of list 1: nothing follows it within the group.
        let mut tail = load(&cx, &conn, 5).await;
        let moved = unwrap_outcome(reindexer.move_down(&cx, &conn, &mut tail).await).unwrap();
        assert_eq!(moved, Repositioned::Unchanged);

        // First of list 2: nothing precedes it within the group.
        let mut head = load(&cx, &conn, 6).await;
        let moved = unwrap_outcome(reindexer.move_up(&cx, &conn, &mut head).await).unwrap();
        assert_eq!(moved, Repositioned::Unchanged);

        let mut eight = load(&cx, &conn, 8).await;
        let moved = unwrap_outcome(reindexer.move_to_start(&cx, &conn, &mut eight).await).unwrap();
        assert_eq!(moved, Repositioned::Moved { from: 3, to: 1 });
        let mut two = load(&cx, &conn, 2).await;
        let moved = unwrap_outcome(reindexer.move_to_end(&cx, &conn, &mut two).await).unwrap();
        assert_eq!(moved, Repositioned::Moved { from: 2, to: 5 });

        assert_eq!(
            ordered_ids(&cx, &conn, &reindexer, &Scope::group(2_i64)).await,
            vec![8, 6, 7, 9, 10]
        );
        assert_eq!(
            ordered_ids(&cx, &conn, &reindexer, &Scope::group(1_i64)).await,
            vec![1, 3, 4, 5, 2]
        );
        assert_contiguous(&cx, &conn, &reindexer, &Scope::group(1_i64)).await;
        assert_contiguous(&cx, &conn, &reindexer, &Scope::group(2_i64)).await;
    });
}

#[test]
fn swapping_across_groups_is_rejected() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        let mut a = load(&cx, &conn, 2).await;
        let mut b = load(&cx, &conn, 7).await;
        let err = expect_err(reindexer.swap_order(&cx, &conn, &mut a, &mut b).await);
        assert_eq!(err.sort_kind(), Some(SortErrorKind::CrossScope));

        assert_eq!(a.order_column, Some(2));
        assert_eq!(load(&cx, &conn, 2).await.order_column, Some(2));
        assert_eq!(load(&cx, &conn, 7).await.order_column, Some(2));
    });
}

#[test]
fn swapping_within_a_group() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        let mut a = load(&cx, &conn, 6).await;
        let mut b = load(&cx, &conn, 10).await;
        unwrap_outcome(a.swap_order_with_model(&cx, &conn, &reindexer, &mut b).await).unwrap();

        assert_eq!(load(&cx, &conn, 6).await.order_column, Some(5));
        assert_eq!(load(&cx, &conn, 10).await.order_column, Some(1));
        assert_eq!(load(&cx, &conn, 1).await.order_column, Some(1));
    });
}

#[test]
fn rows_without_a_group_form_their_own_scope() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();
        seed_lists(&cx, &conn, &reindexer).await;

        let mut loose = Dummy::new(11, "loose");
        create(&cx, &conn, &reindexer, &mut loose).await;
        assert_eq!(loose.order_column, Some(1));

        let list = ordered_ids(&cx, &conn, &reindexer, &Scope::Group(Value::Null)).await;
        assert_eq!(list, vec![11]);
    });
}

#[test]
fn whole_table_scope_is_rejected_when_grouped() {
    let cx = Cx::for_testing();
    block_on(async {
        let conn = open();
        let reindexer = reindexer();

        let err = expect_err(reindexer.ordered_sequence(&cx, &conn, &Scope::all()).await);
        assert_eq!(err.sort_kind(), Some(SortErrorKind::ScopeMismatch));
    });
}
