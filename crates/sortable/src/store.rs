//! Rank storage: the reads and updates the reindexer needs, rendered as SQL.
//!
//! Every method takes an [`Executor`], so the same code runs against a bare
//! connection (reads) or an open transaction (reindexing). Statement
//! construction is split from execution so the SQL can be checked without a
//! database.

use std::ops::RangeInclusive;

use sortable_core::{Cx, Dialect, Error, Executor, NotFoundError, Outcome, Row, Value};

use crate::config::{OrderColumn, validate_identifier};
use crate::macros::{try_outcome, try_result};
use crate::model::{Neighbor, RankEntry, SortDirection};
use crate::scope::Scope;

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Incremental statement builder aware of placeholder numbering.
struct SqlBuilder {
    dialect: Dialect,
    sql: String,
    params: Vec<Value>,
    has_where: bool,
}

impl SqlBuilder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            has_where: false,
        }
    }

    fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    fn ident(&mut self, name: &str) -> &mut Self {
        let quoted = self.dialect.quote_ident(name);
        self.sql.push_str(&quoted);
        self
    }

    fn bind(&mut self, value: Value) -> &mut Self {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// Start the next `WHERE` / `AND` condition.
    fn and(&mut self) -> &mut Self {
        self.sql
            .push_str(if self.has_where { " AND " } else { " WHERE " });
        self.has_where = true;
        self
    }

    fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Storage interface for one sortable table.
#[derive(Debug, Clone)]
pub struct RankStore {
    table: String,
    column: OrderColumn,
}

impl RankStore {
    /// Create a store for `table`. The table name is validated eagerly.
    pub fn new(table: impl Into<String>, column: OrderColumn) -> Result<Self, Error> {
        let table = table.into();
        validate_identifier("table", &table)?;
        Ok(Self { table, column })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &OrderColumn {
        &self.column
    }

    pub(crate) fn not_found(&self, id: &Value) -> Error {
        Error::NotFound(NotFoundError {
            table: self.table.clone(),
            id: id.to_string(),
        })
    }

    // ========================================================================
    // Statement construction
    // ========================================================================

    fn scoped(&self, b: &mut SqlBuilder, scope: &Scope) {
        if let (Some(group), Some(key)) = (self.column.group_key_column_name(), scope.group_key())
        {
            b.and().ident(group);
            if key.is_null() {
                b.push(" IS NULL");
            } else {
                b.push(" = ").bind(key.clone());
            }
        }
    }

    fn select_entries(&self, b: &mut SqlBuilder) {
        b.push("SELECT ")
            .ident(self.column.primary_key_name())
            .push(", ")
            .ident(self.column.rank_column_name());
        if let Some(group) = self.column.group_key_column_name() {
            b.push(", ").ident(group);
        }
        b.push(" FROM ").ident(&self.table);
    }

    fn order_by(&self, b: &mut SqlBuilder, direction: SortDirection) {
        let dir = direction.as_sql();
        b.push(" ORDER BY ")
            .ident(self.column.rank_column_name())
            .push(" ")
            .push(dir)
            .push(", ")
            .ident(self.column.primary_key_name())
            .push(" ")
            .push(dir);
    }

    fn aggregate_statement(&self, dialect: Dialect, func: &str, scope: &Scope) -> Statement {
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT COALESCE(")
            .push(func)
            .push("(")
            .ident(self.column.rank_column_name())
            .push("), 0) FROM ")
            .ident(&self.table);
        self.scoped(&mut b, scope);
        b.build()
    }

    /// `SELECT` of one row by primary key within the scope.
    pub fn find_statement(&self, dialect: Dialect, scope: &Scope, id: &Value) -> Statement {
        let mut b = SqlBuilder::new(dialect);
        self.select_entries(&mut b);
        b.and()
            .ident(self.column.primary_key_name())
            .push(" = ")
            .bind(id.clone());
        self.scoped(&mut b, scope);
        b.push(" LIMIT 1");
        b.build()
    }

    pub fn max_rank_statement(&self, dialect: Dialect, scope: &Scope) -> Statement {
        self.aggregate_statement(dialect, "MAX", scope)
    }

    pub fn min_rank_statement(&self, dialect: Dialect, scope: &Scope) -> Statement {
        self.aggregate_statement(dialect, "MIN", scope)
    }

    pub fn count_statement(&self, dialect: Dialect, scope: &Scope) -> Statement {
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT COUNT(*) FROM ").ident(&self.table);
        self.scoped(&mut b, scope);
        b.build()
    }

    /// `UPDATE` of one row's rank.
    pub fn update_statement(
        &self,
        dialect: Dialect,
        scope: &Scope,
        id: &Value,
        rank: i64,
    ) -> Statement {
        let mut b = SqlBuilder::new(dialect);
        b.push("UPDATE ")
            .ident(&self.table)
            .push(" SET ")
            .ident(self.column.rank_column_name())
            .push(" = ")
            .bind(Value::BigInt(rank));
        b.and()
            .ident(self.column.primary_key_name())
            .push(" = ")
            .bind(id.clone());
        self.scoped(&mut b, scope);
        b.build()
    }

    /// `UPDATE` adding `delta` to every rank inside `range`.
    pub fn shift_statement(
        &self,
        dialect: Dialect,
        scope: &Scope,
        range: &RangeInclusive<i64>,
        delta: i64,
    ) -> Statement {
        let rank = self.column.rank_column_name();
        let mut b = SqlBuilder::new(dialect);
        b.push("UPDATE ")
            .ident(&self.table)
            .push(" SET ")
            .ident(rank)
            .push(" = ")
            .ident(rank)
            .push(" + ")
            .bind(Value::BigInt(delta));
        b.and()
            .ident(rank)
            .push(" >= ")
            .bind(Value::BigInt(*range.start()));
        b.and()
            .ident(rank)
            .push(" <= ")
            .bind(Value::BigInt(*range.end()));
        self.scoped(&mut b, scope);
        b.build()
    }

    /// `SELECT` of the closest ranked row before or after `rank`.
    pub fn neighbor_statement(
        &self,
        dialect: Dialect,
        scope: &Scope,
        rank: i64,
        neighbor: Neighbor,
    ) -> Statement {
        let (cmp, direction) = match neighbor {
            Neighbor::Preceding => (" < ", SortDirection::Descending),
            Neighbor::Following => (" > ", SortDirection::Ascending),
        };
        let mut b = SqlBuilder::new(dialect);
        self.select_entries(&mut b);
        b.and()
            .ident(self.column.rank_column_name())
            .push(cmp)
            .bind(Value::BigInt(rank));
        self.scoped(&mut b, scope);
        self.order_by(&mut b, direction);
        b.push(" LIMIT 1");
        b.build()
    }

    /// `SELECT pk, rank[, group]` of the scope in rank order.
    pub fn ordered_statement(
        &self,
        dialect: Dialect,
        scope: &Scope,
        direction: SortDirection,
    ) -> Statement {
        let mut b = SqlBuilder::new(dialect);
        self.select_entries(&mut b);
        self.scoped(&mut b, scope);
        self.order_by(&mut b, direction);
        b.build()
    }

    /// `SELECT *` of the scope in rank order.
    pub fn ordered_rows_statement(
        &self,
        dialect: Dialect,
        scope: &Scope,
        direction: SortDirection,
    ) -> Statement {
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT * FROM ").ident(&self.table);
        self.scoped(&mut b, scope);
        self.order_by(&mut b, direction);
        b.build()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    async fn scalar<E: Executor>(&self, cx: &Cx, exec: &E, stmt: Statement) -> Outcome<i64, Error> {
        let row = try_outcome!(exec.query_one(cx, &stmt.sql, &stmt.params).await);
        match row {
            Some(row) => match row.get_as::<Option<i64>>(0) {
                Ok(value) => Outcome::Ok(value.unwrap_or(0)),
                Err(e) => Outcome::Err(e),
            },
            None => Outcome::Ok(0),
        }
    }

    async fn entries<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        stmt: Statement,
    ) -> Outcome<Vec<RankEntry>, Error> {
        let rows = try_outcome!(exec.query(cx, &stmt.sql, &stmt.params).await);
        let entries = rows
            .iter()
            .map(|row| RankEntry::from_row(row, &self.column))
            .collect::<Result<Vec<_>, _>>();
        Outcome::Ok(try_result!(entries))
    }

    /// Row with the given primary key inside the scope.
    pub async fn find_by_id<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        id: &Value,
    ) -> Outcome<Option<RankEntry>, Error> {
        let stmt = self.find_statement(exec.dialect(), scope, id);
        let entries = try_outcome!(self.entries(cx, exec, stmt).await);
        Outcome::Ok(entries.into_iter().next())
    }

    /// Highest rank in the scope, 0 when empty.
    pub async fn max_rank<E: Executor>(&self, cx: &Cx, exec: &E, scope: &Scope) -> Outcome<i64, Error> {
        let stmt = self.max_rank_statement(exec.dialect(), scope);
        self.scalar(cx, exec, stmt).await
    }

    /// Lowest rank in the scope, 0 when empty.
    pub async fn min_rank<E: Executor>(&self, cx: &Cx, exec: &E, scope: &Scope) -> Outcome<i64, Error> {
        let stmt = self.min_rank_statement(exec.dialect(), scope);
        self.scalar(cx, exec, stmt).await
    }

    /// Number of rows in the scope.
    pub async fn count<E: Executor>(&self, cx: &Cx, exec: &E, scope: &Scope) -> Outcome<i64, Error> {
        let stmt = self.count_statement(exec.dialect(), scope);
        self.scalar(cx, exec, stmt).await
    }

    /// Set one row's rank. Returns the number of rows changed (0 or 1).
    pub async fn update_rank<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        id: &Value,
        rank: i64,
    ) -> Outcome<u64, Error> {
        let stmt = self.update_statement(exec.dialect(), scope, id, rank);
        exec.execute(cx, &stmt.sql, &stmt.params).await
    }

    /// Add `delta` to every rank in `range`. Touches only those rows.
    pub async fn shift_ranks<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        range: RangeInclusive<i64>,
        delta: i64,
    ) -> Outcome<u64, Error> {
        if range.is_empty() || delta == 0 {
            return Outcome::Ok(0);
        }
        let stmt = self.shift_statement(exec.dialect(), scope, &range, delta);
        exec.execute(cx, &stmt.sql, &stmt.params).await
    }

    /// Closest ranked row before or after `rank`.
    pub async fn neighbor<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        rank: i64,
        neighbor: Neighbor,
    ) -> Outcome<Option<RankEntry>, Error> {
        let stmt = self.neighbor_statement(exec.dialect(), scope, rank, neighbor);
        let entries = try_outcome!(self.entries(cx, exec, stmt).await);
        Outcome::Ok(entries.into_iter().next())
    }

    /// Entries of the scope in rank order.
    pub async fn fetch_ordered<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        direction: SortDirection,
    ) -> Outcome<Vec<RankEntry>, Error> {
        let stmt = self.ordered_statement(exec.dialect(), scope, direction);
        self.entries(cx, exec, stmt).await
    }

    /// Primary keys of the scope in rank order.
    pub async fn fetch_ordered_ids<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        direction: SortDirection,
    ) -> Outcome<Vec<Value>, Error> {
        let entries = try_outcome!(self.fetch_ordered(cx, exec, scope, direction).await);
        Outcome::Ok(entries.into_iter().map(|e| e.id).collect())
    }

    /// Every entry of the scope.
    pub async fn all<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
    ) -> Outcome<Vec<RankEntry>, Error> {
        self.fetch_ordered(cx, exec, scope, SortDirection::Ascending)
            .await
    }

    /// Full rows of the scope in rank order.
    pub async fn fetch_ordered_rows<E: Executor>(
        &self,
        cx: &Cx,
        exec: &E,
        scope: &Scope,
        direction: SortDirection,
    ) -> Outcome<Vec<Row>, Error> {
        let stmt = self.ordered_rows_statement(exec.dialect(), scope, direction);
        exec.query(cx, &stmt.sql, &stmt.params).await
    }
}
