//! Ordering scopes.

use std::fmt;

use sortable_core::{Error, SortErrorKind, Value};

use crate::config::OrderColumn;
use crate::model::Sortable;

/// The set of rows whose ranks are compared with each other.
///
/// Every reindexer call is bound to exactly one scope; rows outside it are
/// never read or written.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// The whole table. Only valid for tables without a group column.
    All,
    /// Rows whose group column equals the value (`Null` matches `IS NULL`).
    Group(Value),
}

impl Scope {
    pub fn all() -> Self {
        Scope::All
    }

    pub fn group(key: impl Into<Value>) -> Self {
        Scope::Group(key.into())
    }

    /// The scope an entity belongs to under `column`.
    pub fn of<M: Sortable + ?Sized>(entity: &M, column: &OrderColumn) -> Self {
        if column.is_grouped() {
            Scope::Group(entity.group_key().unwrap_or(Value::Null))
        } else {
            Scope::All
        }
    }

    /// Group value, if this is a group scope.
    pub fn group_key(&self) -> Option<&Value> {
        match self {
            Scope::All => None,
            Scope::Group(key) => Some(key),
        }
    }

    /// Reject scopes that do not fit the table's grouping.
    pub fn check(&self, column: &OrderColumn) -> Result<(), Error> {
        match (self, column.group_key_column_name()) {
            (Scope::All, None) | (Scope::Group(_), Some(_)) => Ok(()),
            (Scope::All, Some(group)) => Err(Error::sort(
                SortErrorKind::ScopeMismatch,
                format!("table is grouped by `{group}`; pass a group scope"),
            )),
            (Scope::Group(key), None) => Err(Error::sort(
                SortErrorKind::ScopeMismatch,
                format!("group scope {key} used on a table without a group column"),
            )),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Group(key) => write!(f, "group={key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortableConfig;
    use crate::model::RankEntry;

    fn grouped() -> OrderColumn {
        SortableConfig::new()
            .group_column_name("list_id")
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_scope_of_ungrouped_is_all() {
        let entry = RankEntry {
            id: Value::BigInt(1),
            rank: Some(1),
            group: Some(Value::BigInt(4)),
        };
        assert_eq!(Scope::of(&entry, &OrderColumn::default()), Scope::All);
    }

    #[test]
    fn test_scope_of_grouped_uses_group_key() {
        let mut entry = RankEntry {
            id: Value::BigInt(1),
            rank: Some(1),
            group: Some(Value::BigInt(4)),
        };
        assert_eq!(Scope::of(&entry, &grouped()), Scope::group(4_i64));

        entry.group = None;
        assert_eq!(Scope::of(&entry, &grouped()), Scope::Group(Value::Null));
    }

    #[test]
    fn test_check_rejects_mismatch() {
        assert!(Scope::All.check(&OrderColumn::default()).is_ok());
        assert!(Scope::group(1_i64).check(&grouped()).is_ok());

        let err = Scope::All.check(&grouped()).unwrap_err();
        assert_eq!(err.sort_kind(), Some(SortErrorKind::ScopeMismatch));

        let err = Scope::group(1_i64).check(&OrderColumn::default()).unwrap_err();
        assert_eq!(err.sort_kind(), Some(SortErrorKind::ScopeMismatch));
    }

    #[test]
    fn test_display() {
        assert_eq!(Scope::All.to_string(), "all");
        assert_eq!(Scope::group("todo").to_string(), "group='todo'");
    }
}
