//! Rank-mutating and rank-querying algorithms.
//!
//! Every mutation runs inside a single transaction on the caller's
//! connection: the reads that decide what to move and the updates that move
//! it see the same snapshot, and a failure rolls every update back so the
//! scope keeps its contiguous `1..N` ranks. The caller's entity is only
//! updated in memory after the commit succeeded.
//!
//! Moves touch only the rows between the old and the new position.
//!
//! # Example
//!
//! ```ignore
//! let reindexer = Reindexer::new("dummies", OrderColumn::default())?;
//!
//! // Before inserting a new row
//! reindexer.initialize_on_create(&cx, &conn, &mut dummy).await;
//!
//! // Reorder
//! reindexer.move_to_start(&cx, &conn, &mut dummy).await;
//! reindexer.swap_order(&cx, &conn, &mut a, &mut b).await;
//! ```

use std::ops::RangeInclusive;

use sortable_core::{
    Connection, Cx, Error, Executor, IsolationLevel, Outcome, Row, SortErrorKind, TransactionOps,
    Value,
};

use crate::config::{OrderColumn, SortableConfig};
use crate::macros::{try_outcome, try_result};
use crate::model::{Neighbor, RankEntry, Repositioned, SortDirection, Sortable};
use crate::scope::Scope;
use crate::store::RankStore;

/// Identity of the entity being moved. Its rank is read from the store
/// inside the transaction, never taken from memory.
struct Subject {
    scope: Scope,
    id: Value,
}

/// Ordering operations for one table.
#[derive(Debug, Clone)]
pub struct Reindexer {
    store: RankStore,
}

impl Reindexer {
    /// Create a reindexer for `table`.
    pub fn new(table: impl Into<String>, column: OrderColumn) -> Result<Self, Error> {
        Ok(Self {
            store: RankStore::new(table, column)?,
        })
    }

    /// Resolve `config` and create a reindexer for `table`.
    pub fn from_config(table: impl Into<String>, config: SortableConfig) -> Result<Self, Error> {
        Self::new(table, config.resolve()?)
    }

    /// Name of the sortable table.
    pub fn table(&self) -> &str {
        self.store.table()
    }

    /// Resolved ordering configuration.
    pub fn column(&self) -> &OrderColumn {
        self.store.column()
    }

    /// The underlying storage interface.
    pub fn store(&self) -> &RankStore {
        &self.store
    }

    /// The scope `entity` belongs to.
    pub fn scope_of<M: Sortable + ?Sized>(&self, entity: &M) -> Scope {
        Scope::of(entity, self.column())
    }

    fn subject<M: Sortable + ?Sized>(&self, entity: &M) -> Result<Subject, Error> {
        let id = entity.sort_key();
        if entity.rank().is_none() {
            return Err(self.unranked(&id));
        }
        Ok(Subject {
            scope: self.scope_of(entity),
            id,
        })
    }

    fn unranked(&self, id: &Value) -> Error {
        Error::sort(
            SortErrorKind::Unranked,
            format!("row {id} in `{}` has no rank", self.table()),
        )
    }

    /// Current stored rank of the subject's row.
    async fn locate<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        subject: &Subject,
    ) -> Outcome<i64, Error> {
        let entry = try_outcome!(
            self.store
                .find_by_id(cx, exec, &subject.scope, &subject.id)
                .await
        );
        match entry {
            Some(RankEntry { rank: Some(rank), .. }) => Outcome::Ok(rank),
            Some(_) => Outcome::Err(self.unranked(&subject.id)),
            None => Outcome::Err(self.store.not_found(&subject.id)),
        }
    }

    /// Write the committed rank back into `entity`.
    fn apply<M: Sortable + ?Sized>(
        &self,
        entity: &mut M,
        (result, rank): (Repositioned, i64),
    ) -> Repositioned {
        entity.set_rank(rank);
        match result {
            Repositioned::Moved { from, to } => {
                tracing::info!(
                    table = self.table(),
                    id = %entity.sort_key(),
                    from,
                    to,
                    "Rank changed"
                );
            }
            Repositioned::Unchanged => {
                tracing::debug!(
                    table = self.table(),
                    id = %entity.sort_key(),
                    "Already at the edge of its scope"
                );
            }
        }
        result
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Give a not-yet-inserted entity the next rank in its scope.
    ///
    /// Sets `rank = max + 1` (1 for an empty scope) and returns `true` when
    /// the table sorts on creation; otherwise leaves the entity untouched and
    /// returns `false`. Call once, before the row is written.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, entity), fields(table = %self.table()))]
    pub async fn initialize_on_create<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
    ) -> Outcome<bool, Error> {
        if !self.column().should_sort_when_creating() {
            return Outcome::Ok(false);
        }
        let scope = self.scope_of(entity);
        let highest = try_outcome!(self.store.max_rank(cx, conn, &scope).await);
        entity.set_rank(highest + 1);
        tracing::debug!(%scope, rank = highest + 1, "Assigned rank on creation");
        Outcome::Ok(true)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Highest rank in the scope, 0 when the scope is empty.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = %self.table()))]
    pub async fn highest_rank<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
    ) -> Outcome<i64, Error> {
        try_result!(scope.check(self.column()));
        self.store.max_rank(cx, conn, scope).await
    }

    /// Lowest rank in the scope, 0 when the scope is empty.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = %self.table()))]
    pub async fn lowest_rank<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
    ) -> Outcome<i64, Error> {
        try_result!(scope.check(self.column()));
        self.store.min_rank(cx, conn, scope).await
    }

    /// Entries of the scope in ascending rank order.
    pub async fn ordered_sequence<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
    ) -> Outcome<Vec<RankEntry>, Error> {
        self.ordered_sequence_by(cx, conn, scope, SortDirection::Ascending)
            .await
    }

    /// Entries of the scope in the given rank order. Ties break on the primary key.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = %self.table()))]
    pub async fn ordered_sequence_by<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
        direction: SortDirection,
    ) -> Outcome<Vec<RankEntry>, Error> {
        try_result!(scope.check(self.column()));
        self.store.fetch_ordered(cx, conn, scope, direction).await
    }

    /// Full rows of the scope in the given rank order, for host-side mapping.
    #[tracing::instrument(level = "debug", skip(self, cx, conn), fields(table = %self.table()))]
    pub async fn ordered_rows<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
        direction: SortDirection,
    ) -> Outcome<Vec<Row>, Error> {
        try_result!(scope.check(self.column()));
        self.store.fetch_ordered_rows(cx, conn, scope, direction).await
    }

    /// Look up one row of the scope.
    pub async fn find<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
        id: &Value,
    ) -> Outcome<RankEntry, Error> {
        try_result!(scope.check(self.column()));
        match try_outcome!(self.store.find_by_id(cx, conn, scope, id).await) {
            Some(entry) => Outcome::Ok(entry),
            None => Outcome::Err(self.store.not_found(id)),
        }
    }

    /// Reload the entity's rank from the store.
    pub async fn refresh<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
    ) -> Outcome<RankEntry, Error> {
        let scope = self.scope_of(entity);
        let entry = try_outcome!(self.find(cx, conn, &scope, &entity.sort_key()).await);
        if let Some(rank) = entry.rank {
            entity.set_rank(rank);
        }
        Outcome::Ok(entry)
    }

    // ========================================================================
    // Bulk renumbering
    // ========================================================================

    /// Assign `start_rank, start_rank + 1, ...` to `ids` in list order.
    ///
    /// Ids that are not in the scope are ignored; rows of the scope missing
    /// from `ids` keep their ranks. If an id is listed twice its last position
    /// wins. Returns the number of rows updated.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, ids), fields(table = %self.table(), ids = ids.len()))]
    pub async fn set_new_order<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
        ids: &[Value],
        start_rank: i64,
    ) -> Outcome<u64, Error> {
        try_result!(scope.check(self.column()));
        let ranks = try_result!(self.rank_span(start_rank, ids.len()));
        let tx = try_outcome!(conn.begin_with(cx, IsolationLevel::Serializable).await);
        let outcome = self.renumber(cx, &tx, scope, ids, ranks).await;
        let updated = try_outcome!(finish(cx, tx, outcome).await);

        tracing::info!(
            table = self.table(),
            %scope,
            requested = ids.len(),
            updated,
            start_rank,
            "Applied new order"
        );
        Outcome::Ok(updated)
    }

    /// [`set_new_order`](Self::set_new_order) starting at rank 1.
    pub async fn set_new_order_from_one<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        scope: &Scope,
        ids: &[Value],
    ) -> Outcome<u64, Error> {
        self.set_new_order(cx, conn, scope, ids, 1).await
    }

    /// Ranks `start_rank ..= start_rank + len - 1`, rejected if they overflow.
    fn rank_span(&self, start_rank: i64, len: usize) -> Result<RangeInclusive<i64>, Error> {
        let last = i64::try_from(len.saturating_sub(1))
            .ok()
            .and_then(|offset| start_rank.checked_add(offset));
        match last {
            Some(last) => Ok(start_rank..=last),
            None => Err(Error::sort(
                SortErrorKind::RankOutOfRange,
                format!(
                    "{len} ids starting at rank {start_rank} exceed the rank range of `{}`",
                    self.table()
                ),
            )),
        }
    }

    async fn renumber<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        ids: &[Value],
        ranks: RangeInclusive<i64>,
    ) -> Outcome<u64, Error> {
        let mut updated = 0;
        for (rank, id) in ranks.zip(ids) {
            let changed = try_outcome!(self.store.update_rank(cx, exec, scope, id, rank).await);
            if changed == 0 {
                tracing::debug!(id = %id, "Ignoring id outside the scope");
            }
            updated += changed;
        }
        Outcome::Ok(updated)
    }

    // ========================================================================
    // Single-step moves
    // ========================================================================

    /// Swap ranks with the closest entity before this one.
    ///
    /// Returns [`Repositioned::Unchanged`] when the entity is already first.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, entity), fields(table = %self.table()))]
    pub async fn move_up<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
    ) -> Outcome<Repositioned, Error> {
        self.step(cx, conn, entity, Neighbor::Preceding).await
    }

    /// Swap ranks with the closest entity after this one.
    ///
    /// Returns [`Repositioned::Unchanged`] when the entity is already last.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, entity), fields(table = %self.table()))]
    pub async fn move_down<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
    ) -> Outcome<Repositioned, Error> {
        self.step(cx, conn, entity, Neighbor::Following).await
    }

    async fn step<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
        toward: Neighbor,
    ) -> Outcome<Repositioned, Error> {
        let subject = try_result!(self.subject(entity));
        let tx = try_outcome!(conn.begin(cx).await);
        let outcome = self.step_in(cx, &tx, &subject, toward).await;
        let placed = try_outcome!(finish(cx, tx, outcome).await);
        Outcome::Ok(self.apply(entity, placed))
    }

    async fn step_in<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        subject: &Subject,
        toward: Neighbor,
    ) -> Outcome<(Repositioned, i64), Error> {
        let rank = try_outcome!(self.locate(cx, exec, subject).await);
        let neighbor = try_outcome!(
            self.store
                .neighbor(cx, exec, &subject.scope, rank, toward)
                .await
        );
        let Some((other, other_rank)) = neighbor.and_then(|n| n.rank.map(|r| (n.id, r))) else {
            return Outcome::Ok((Repositioned::Unchanged, rank));
        };
        try_outcome!(
            self.exchange(cx, exec, &subject.scope, (&subject.id, rank), (&other, other_rank))
                .await
        );
        Outcome::Ok((
            Repositioned::Moved {
                from: rank,
                to: other_rank,
            },
            other_rank,
        ))
    }

    /// Give `a` the rank of `b` and `b` the rank of `a`.
    async fn exchange<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        a: (&Value, i64),
        b: (&Value, i64),
    ) -> Outcome<(), Error> {
        for (id, rank) in [(a.0, b.1), (b.0, a.1)] {
            let changed = try_outcome!(self.store.update_rank(cx, exec, scope, id, rank).await);
            if changed == 0 {
                return Outcome::Err(self.store.not_found(id));
            }
        }
        Outcome::Ok(())
    }

    // ========================================================================
    // Swaps
    // ========================================================================

    /// Exchange the ranks of two entities of the same scope.
    ///
    /// Both ranks are read from the store inside the transaction and both
    /// entities are updated in memory. Entities of different scopes are
    /// rejected with [`SortErrorKind::CrossScope`].
    #[tracing::instrument(level = "debug", skip(self, cx, conn, a, b), fields(table = %self.table()))]
    pub async fn swap_order<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        a: &mut M,
        b: &mut M,
    ) -> Outcome<(), Error> {
        let first = try_result!(self.subject(a));
        let second = try_result!(self.subject(b));
        if first.scope != second.scope {
            return Outcome::Err(Error::sort(
                SortErrorKind::CrossScope,
                format!(
                    "cannot swap row {} ({}) with row {} ({})",
                    first.id, first.scope, second.id, second.scope
                ),
            ));
        }
        if first.id == second.id {
            return Outcome::Ok(());
        }

        let tx = try_outcome!(conn.begin(cx).await);
        let outcome = self.swap_in(cx, &tx, &first, &second).await;
        let (first_rank, second_rank) = try_outcome!(finish(cx, tx, outcome).await);

        a.set_rank(second_rank);
        b.set_rank(first_rank);
        tracing::info!(
            table = self.table(),
            first = %first.id,
            second = %second.id,
            first_rank = second_rank,
            second_rank = first_rank,
            "Swapped ranks"
        );
        Outcome::Ok(())
    }

    /// Exchange the stored ranks; returns them as they were before the swap.
    async fn swap_in<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        first: &Subject,
        second: &Subject,
    ) -> Outcome<(i64, i64), Error> {
        let first_rank = try_outcome!(self.locate(cx, exec, first).await);
        let second_rank = try_outcome!(self.locate(cx, exec, second).await);
        try_outcome!(
            self.exchange(
                cx,
                exec,
                &first.scope,
                (&first.id, first_rank),
                (&second.id, second_rank),
            )
            .await
        );
        Outcome::Ok((first_rank, second_rank))
    }

    /// Instance-style spelling of [`swap_order`](Self::swap_order).
    pub async fn swap_order_with_model<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        this: &mut M,
        other: &mut M,
    ) -> Outcome<(), Error> {
        self.swap_order(cx, conn, this, other).await
    }

    // ========================================================================
    // Moves to the edges
    // ========================================================================

    /// Move the entity to the first rank of its scope.
    ///
    /// Entities that were before it shift down by one; entities after it are
    /// not touched.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, entity), fields(table = %self.table()))]
    pub async fn move_to_start<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
    ) -> Outcome<Repositioned, Error> {
        let subject = try_result!(self.subject(entity));
        let tx = try_outcome!(conn.begin(cx).await);
        let outcome = self.rotate_to_start(cx, &tx, &subject).await;
        let placed = try_outcome!(finish(cx, tx, outcome).await);
        Outcome::Ok(self.apply(entity, placed))
    }

    async fn rotate_to_start<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        subject: &Subject,
    ) -> Outcome<(Repositioned, i64), Error> {
        let rank = try_outcome!(self.locate(cx, exec, subject).await);
        let first = try_outcome!(self.store.min_rank(cx, exec, &subject.scope).await);
        if rank <= first {
            return Outcome::Ok((Repositioned::Unchanged, rank));
        }
        try_outcome!(
            self.store
                .shift_ranks(cx, exec, &subject.scope, first..=rank - 1, 1)
                .await
        );
        try_outcome!(self.place(cx, exec, subject, first).await);
        Outcome::Ok((Repositioned::Moved { from: rank, to: first }, first))
    }

    /// Move the entity to the last rank of its scope.
    ///
    /// Entities that were after it shift up by one; entities before it are
    /// not touched.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, entity), fields(table = %self.table()))]
    pub async fn move_to_end<C: Connection, M: Sortable + ?Sized>(
        &self,
        cx: &Cx,
        conn: &C,
        entity: &mut M,
    ) -> Outcome<Repositioned, Error> {
        let subject = try_result!(self.subject(entity));
        let tx = try_outcome!(conn.begin(cx).await);
        let outcome = self.rotate_to_end(cx, &tx, &subject).await;
        let placed = try_outcome!(finish(cx, tx, outcome).await);
        Outcome::Ok(self.apply(entity, placed))
    }

    async fn rotate_to_end<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        subject: &Subject,
    ) -> Outcome<(Repositioned, i64), Error> {
        let rank = try_outcome!(self.locate(cx, exec, subject).await);
        let last = try_outcome!(self.store.max_rank(cx, exec, &subject.scope).await);
        if rank >= last {
            return Outcome::Ok((Repositioned::Unchanged, rank));
        }
        try_outcome!(
            self.store
                .shift_ranks(cx, exec, &subject.scope, rank + 1..=last, -1)
                .await
        );
        try_outcome!(self.place(cx, exec, subject, last).await);
        Outcome::Ok((Repositioned::Moved { from: rank, to: last }, last))
    }

    /// Write the subject's new rank; a vanished row aborts the reindex.
    async fn place<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        subject: &Subject,
        rank: i64,
    ) -> Outcome<(), Error> {
        let changed = try_outcome!(
            self.store
                .update_rank(cx, exec, &subject.scope, &subject.id, rank)
                .await
        );
        if changed == 0 {
            return Outcome::Err(self.store.not_found(&subject.id));
        }
        Outcome::Ok(())
    }
}

/// Commit `tx` if `outcome` succeeded, otherwise roll it back and return the
/// original failure.
async fn finish<T, X: TransactionOps>(
    cx: &Cx,
    tx: X,
    outcome: Outcome<T, Error>,
) -> Outcome<T, Error> {
    match outcome {
        Outcome::Ok(value) => tx.commit(cx).await.map(|()| value),
        failed => {
            if let Outcome::Err(e) = tx.rollback(cx).await {
                tracing::warn!(error = %e, "Rollback after failed reindex also failed");
            }
            failed
        }
    }
}
