//! Method-call spelling of the reindexer operations on entities.

use std::future::Future;

use sortable_core::{Connection, Cx, Error, Outcome};

use crate::model::{Repositioned, Sortable};
use crate::reindexer::Reindexer;

/// Entity-side entry points, available on every [`Sortable`].
///
/// ```ignore
/// dummy.move_order_down(&cx, &conn, &reindexer).await;
/// first.swap_order_with_model(&cx, &conn, &reindexer, &mut second).await;
/// ```
pub trait SortableExt: Sortable {
    /// See [`Reindexer::initialize_on_create`].
    fn initialize_order<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<bool, Error>> + Send
    where
        Self: Send;

    /// See [`Reindexer::move_up`].
    fn move_order_up<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send;

    /// See [`Reindexer::move_down`].
    fn move_order_down<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send;

    /// See [`Reindexer::move_to_start`].
    fn move_to_start<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send;

    /// See [`Reindexer::move_to_end`].
    fn move_to_end<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send;

    /// See [`Reindexer::swap_order_with_model`].
    fn swap_order_with_model<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
        other: &mut Self,
    ) -> impl Future<Output = Outcome<(), Error>> + Send
    where
        Self: Send;
}

impl<T: Sortable + ?Sized> SortableExt for T {
    fn initialize_order<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<bool, Error>> + Send
    where
        Self: Send,
    {
        async move { reindexer.initialize_on_create(cx, conn, self).await }
    }

    fn move_order_up<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send,
    {
        async move { reindexer.move_up(cx, conn, self).await }
    }

    fn move_order_down<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send,
    {
        async move { reindexer.move_down(cx, conn, self).await }
    }

    fn move_to_start<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send,
    {
        async move { reindexer.move_to_start(cx, conn, self).await }
    }

    fn move_to_end<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
    ) -> impl Future<Output = Outcome<Repositioned, Error>> + Send
    where
        Self: Send,
    {
        async move { reindexer.move_to_end(cx, conn, self).await }
    }

    fn swap_order_with_model<C: Connection>(
        &mut self,
        cx: &Cx,
        conn: &C,
        reindexer: &Reindexer,
        other: &mut Self,
    ) -> impl Future<Output = Outcome<(), Error>> + Send
    where
        Self: Send,
    {
        async move { reindexer.swap_order_with_model(cx, conn, self, other).await }
    }
}
