//! Entities taking part in an ordering.

use sortable_core::{Error, Row, Value};

use crate::config::OrderColumn;

/// A record with a rank column.
///
/// Implemented by host models. The reindexer reads the rank from the
/// in-memory entity and writes the new rank back after a successful update.
pub trait Sortable {
    /// Primary-key value of the row.
    fn sort_key(&self) -> Value;

    /// Current rank, `None` when the row has not been ranked yet.
    fn rank(&self) -> Option<i64>;

    fn set_rank(&mut self, rank: i64);

    /// Value of the group column, for grouped tables.
    fn group_key(&self) -> Option<Value> {
        None
    }
}

/// The minimal view of a row the reindexer reads back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    pub id: Value,
    pub rank: Option<i64>,
    /// Group column value; `None` when the table is not grouped.
    pub group: Option<Value>,
}

impl RankEntry {
    /// Decode a row selected as `pk, rank[, group]`.
    pub(crate) fn from_row(row: &Row, column: &OrderColumn) -> Result<Self, Error> {
        let id = row.get_as::<Value>(0)?;
        let rank = row.get_as::<Option<i64>>(1)?;
        let group = if column.is_grouped() {
            Some(row.get_as::<Value>(2)?)
        } else {
            None
        };
        Ok(Self { id, rank, group })
    }
}

impl Sortable for RankEntry {
    fn sort_key(&self) -> Value {
        self.id.clone()
    }

    fn rank(&self) -> Option<i64> {
        self.rank
    }

    fn set_rank(&mut self, rank: i64) {
        self.rank = Some(rank);
    }

    fn group_key(&self) -> Option<Value> {
        self.group.clone()
    }
}

/// What a move operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repositioned {
    /// The entity now holds rank `to`.
    Moved { from: i64, to: i64 },
    /// The entity already was at the requested edge; nothing was written.
    Unchanged,
}

impl Repositioned {
    pub fn is_moved(self) -> bool {
        matches!(self, Repositioned::Moved { .. })
    }
}

/// Direction of an ordered read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Which adjacent entity to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbor {
    /// Greatest rank below the given one.
    Preceding,
    /// Smallest rank above the given one.
    Following,
}
