//! Ordering configuration.
//!
//! [`SortableConfig`] is the loosely-specified mapping a host hands over
//! (usually deserialized from JSON or its own config files). [`OrderColumn`]
//! is the validated form the reindexer works with; every check happens in
//! [`OrderColumn::resolve`], never on first use.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sortable_core::Error;

/// Column holding the rank when none is configured.
pub const DEFAULT_ORDER_COLUMN: &str = "order_column";

/// Primary-key column when none is configured.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Raw ordering configuration for one table.
///
/// Recognized keys: `order_column_name`, `sort_when_creating`,
/// `group_column_name` and `primary_key_name`. Missing keys take their
/// defaults; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortableConfig {
    /// Column holding the rank (default: `order_column`).
    pub order_column_name: String,
    /// Assign `max + 1` to new rows before they are inserted (default: true).
    pub sort_when_creating: bool,
    /// Column whose value partitions the table into independent scopes.
    pub group_column_name: Option<String>,
    /// Column identifying a row (default: `id`).
    pub primary_key_name: String,
}

impl Default for SortableConfig {
    fn default() -> Self {
        Self {
            order_column_name: DEFAULT_ORDER_COLUMN.to_string(),
            sort_when_creating: true,
            group_column_name: None,
            primary_key_name: DEFAULT_PRIMARY_KEY.to_string(),
        }
    }
}

impl SortableConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rank column.
    pub fn order_column_name(mut self, name: impl Into<String>) -> Self {
        self.order_column_name = name.into();
        self
    }

    /// Enable or disable rank assignment on creation.
    pub fn sort_when_creating(mut self, enabled: bool) -> Self {
        self.sort_when_creating = enabled;
        self
    }

    /// Scope ordering by the given column.
    pub fn group_column_name(mut self, name: impl Into<String>) -> Self {
        self.group_column_name = Some(name.into());
        self
    }

    /// Set the primary-key column.
    pub fn primary_key_name(mut self, name: impl Into<String>) -> Self {
        self.primary_key_name = name.into();
        self
    }

    /// Parse a JSON object.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::config("sortable", e.to_string()))
    }

    /// Convert an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::config("sortable", e.to_string()))
    }

    /// Validate into an [`OrderColumn`].
    pub fn resolve(self) -> Result<OrderColumn, Error> {
        OrderColumn::resolve(self)
    }
}

/// Validated ordering configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderColumn {
    rank_column: String,
    group_column: Option<String>,
    primary_key: String,
    sort_when_creating: bool,
}

impl OrderColumn {
    /// Validate a raw configuration.
    pub fn resolve(config: SortableConfig) -> Result<Self, Error> {
        validate_identifier("order_column_name", &config.order_column_name)?;
        validate_identifier("primary_key_name", &config.primary_key_name)?;
        if config.order_column_name == config.primary_key_name {
            return Err(Error::config(
                "order_column_name",
                "must differ from the primary key column",
            ));
        }
        if let Some(group) = &config.group_column_name {
            validate_identifier("group_column_name", group)?;
            if *group == config.order_column_name || *group == config.primary_key_name {
                return Err(Error::config(
                    "group_column_name",
                    format!("`{group}` is already used as the order or primary key column"),
                ));
            }
        }

        Ok(Self {
            rank_column: config.order_column_name,
            group_column: config.group_column_name,
            primary_key: config.primary_key_name,
            sort_when_creating: config.sort_when_creating,
        })
    }

    /// Column holding the rank.
    pub fn rank_column_name(&self) -> &str {
        &self.rank_column
    }

    /// Column defining ordering scopes, if the table is grouped.
    pub fn group_key_column_name(&self) -> Option<&str> {
        self.group_column.as_deref()
    }

    /// Column identifying a row.
    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    /// Whether new rows get `max + 1` before insertion.
    pub fn should_sort_when_creating(&self) -> bool {
        self.sort_when_creating
    }

    pub fn is_grouped(&self) -> bool {
        self.group_column.is_some()
    }
}

impl Default for OrderColumn {
    fn default() -> Self {
        Self {
            rank_column: DEFAULT_ORDER_COLUMN.to_string(),
            group_column: None,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            sort_when_creating: true,
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
    })
}

/// Check that `value` is a plain SQL identifier.
pub(crate) fn validate_identifier(field: &'static str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::config(field, "must not be empty"));
    }
    if !identifier_pattern().is_match(value) {
        return Err(Error::config(
            field,
            format!("`{value}` is not a valid SQL identifier"),
        ));
    }
    Ok(())
}
