//! Fluent queries.
//!
//! A query moves through three states:
//!
//! - [`Where`]: nothing filtered yet. [`Where::filter`] picks an attribute.
//! - [`Compare`]: an attribute is picked. Each comparison appends one
//!   predicate and moves on.
//! - [`Junction`]: at least one predicate. [`Junction::and`] and
//!   [`Junction::or`] pick the next attribute; ordering and execution
//!   happen here.
//!
//! ```rust,ignore
//! let rice = db
//!     .select_where::<Food>()?
//!     .filter(Food::NAME)
//!     .like("%Rice%")
//!     .order_ascending_by(Food::NAME)
//!     .as_list()?;
//! ```
//!
//! Values are always bound as parameters. Only table and column names,
//! which come from the schema, are written into the SQL text. Predicates
//! are joined left to right without parentheses, so `AND` binds tighter
//! than `OR` as usual in SQL.

use crate::database::Database;
use crate::entity::{Attr, Entity};
use crate::error::{CoreError, CoreResult};
use crate::schema::ID;
use crate::value::PropertyValue;
use modeldb_storage::SqlValue;
use std::fmt;
use std::marker::PhantomData;

struct Query<M> {
    db: Database,
    table: String,
    predicate: String,
    params: Vec<SqlValue>,
    order: Vec<String>,
    error: Option<CoreError>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Entity> Query<M> {
    /// Resolves `column` against the entity's table, recording the first
    /// unknown column as the query's error.
    fn column(&mut self, column: &'static str) -> &'static str {
        if self.error.is_none() {
            let known = self
                .db
                .registry()
                .entity_table(M::ENTITY_NAME)
                .is_some_and(|table| table.field_by_column(column).is_some());
            if !known {
                self.error = Some(CoreError::unknown_field(M::ENTITY_NAME, column));
            }
        }
        column
    }

    fn push(&mut self, sql: &str) {
        self.predicate.push_str(sql);
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {ID} FROM {}", self.table);
        if !self.predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicate);
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }
        sql
    }

    fn finish(self) -> CoreResult<(String, Vec<SqlValue>)> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok((self.to_sql(), self.params))
    }

    fn execute(self) -> CoreResult<Vec<M>> {
        let db = self.db.clone();
        let (sql, params) = self.finish()?;
        let result = db.run_query(&sql, &params)?;
        result
            .column(ID)
            .unwrap_or_default()
            .iter()
            .filter_map(SqlValue::as_i64)
            .map(|id| db.resolve::<M>(id))
            .collect()
    }
}

/// A query with no predicate yet.
pub struct Where<M> {
    query: Query<M>,
}

impl<M: Entity> Where<M> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            query: Query {
                db,
                table: M::table_name(),
                predicate: String::new(),
                params: Vec::new(),
                order: Vec::new(),
                error: None,
                _marker: PhantomData,
            },
        }
    }

    /// Starts a predicate on `attr`.
    #[must_use]
    pub fn filter<T: PropertyValue>(mut self, attr: Attr<M, T>) -> Compare<M, T> {
        let column = self.query.column(attr.column());
        self.query.push(column);
        Compare::new(self.query)
    }

    /// Every row, ordered by id.
    ///
    /// # Errors
    ///
    /// Fails if the query cannot run.
    pub fn as_list(mut self) -> CoreResult<Vec<M>> {
        self.query.order.push(format!("{ID} ASC"));
        self.query.execute()
    }

    /// The SQL text and bound parameters.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownField`] if an attribute did not
    /// belong to the entity.
    pub fn to_sql(self) -> CoreResult<(String, Vec<SqlValue>)> {
        self.query.finish()
    }
}

/// A query waiting for a comparison on an attribute of type `T`.
pub struct Compare<M, T> {
    query: Query<M>,
    _marker: PhantomData<fn() -> T>,
}

impl<M: Entity, T: PropertyValue> Compare<M, T> {
    fn new(query: Query<M>) -> Self {
        Self {
            query,
            _marker: PhantomData,
        }
    }

    fn bind(mut self, op: &str, value: SqlValue) -> Junction<M> {
        self.query.push(op);
        self.query.params.push(value);
        Junction { query: self.query }
    }

    fn bind_list<I>(mut self, op: &str, values: I) -> Junction<M>
    where
        I: IntoIterator<Item = T>,
    {
        let mut placeholders = Vec::new();
        for value in values {
            placeholders.push("?");
            self.query.params.push(value.encode());
        }
        self.query.push(&format!("{op} ({})", placeholders.join(", ")));
        Junction { query: self.query }
    }

    fn unary(mut self, op: &str) -> Junction<M> {
        self.query.push(op);
        Junction { query: self.query }
    }

    /// `= value`
    #[must_use]
    pub fn equal(self, value: impl Into<T>) -> Junction<M> {
        self.bind(" = ?", value.into().encode())
    }

    /// `!= value`
    #[must_use]
    pub fn not_equal(self, value: impl Into<T>) -> Junction<M> {
        self.bind(" != ?", value.into().encode())
    }

    /// `LIKE pattern`
    #[must_use]
    pub fn like(self, pattern: impl Into<String>) -> Junction<M> {
        self.bind(" LIKE ?", SqlValue::Text(pattern.into()))
    }

    /// `NOT LIKE pattern`
    #[must_use]
    pub fn not_like(self, pattern: impl Into<String>) -> Junction<M> {
        self.bind(" NOT LIKE ?", SqlValue::Text(pattern.into()))
    }

    /// `IN (values...)`
    #[must_use]
    pub fn is_in<I>(self, values: I) -> Junction<M>
    where
        I: IntoIterator<Item = T>,
    {
        self.bind_list(" IN", values)
    }

    /// `NOT IN (values...)`
    #[must_use]
    pub fn not_in<I>(self, values: I) -> Junction<M>
    where
        I: IntoIterator<Item = T>,
    {
        self.bind_list(" NOT IN", values)
    }

    /// `IS NULL`
    #[must_use]
    pub fn is_null(self) -> Junction<M> {
        self.unary(" IS NULL")
    }

    /// `IS NOT NULL`
    #[must_use]
    pub fn is_not_null(self) -> Junction<M> {
        self.unary(" IS NOT NULL")
    }

    /// `> value`
    #[must_use]
    pub fn greater_than(self, value: impl Into<T>) -> Junction<M> {
        self.bind(" > ?", value.into().encode())
    }

    /// `>= value`
    #[must_use]
    pub fn greater_than_or_equal(self, value: impl Into<T>) -> Junction<M> {
        self.bind(" >= ?", value.into().encode())
    }

    /// `< value`
    #[must_use]
    pub fn less_than(self, value: impl Into<T>) -> Junction<M> {
        self.bind(" < ?", value.into().encode())
    }

    /// `<= value`
    #[must_use]
    pub fn less_than_or_equal(self, value: impl Into<T>) -> Junction<M> {
        self.bind(" <= ?", value.into().encode())
    }
}

/// A query with at least one predicate.
pub struct Junction<M> {
    query: Query<M>,
}

impl<M: Entity> Junction<M> {
    /// Adds `AND` and starts a predicate on `attr`.
    #[must_use]
    pub fn and<T: PropertyValue>(mut self, attr: Attr<M, T>) -> Compare<M, T> {
        let column = self.query.column(attr.column());
        self.query.push(&format!(" AND {column}"));
        Compare::new(self.query)
    }

    /// Adds `OR` and starts a predicate on `attr`.
    #[must_use]
    pub fn or<T: PropertyValue>(mut self, attr: Attr<M, T>) -> Compare<M, T> {
        let column = self.query.column(attr.column());
        self.query.push(&format!(" OR {column}"));
        Compare::new(self.query)
    }

    /// Orders results by `attr`, ascending. Later calls break ties.
    #[must_use]
    pub fn order_ascending_by<T: PropertyValue>(mut self, attr: Attr<M, T>) -> Self {
        let column = self.query.column(attr.column());
        self.query.order.push(format!("{column} ASC"));
        self
    }

    /// Orders results by `attr`, descending. Later calls break ties.
    #[must_use]
    pub fn order_descending_by<T: PropertyValue>(mut self, attr: Attr<M, T>) -> Self {
        let column = self.query.column(attr.column());
        self.query.order.push(format!("{column} DESC"));
        self
    }

    /// Runs the query and resolves every matching row to its entity.
    ///
    /// Rows come back in the engine's order unless an ordering was added.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownField`] if an attribute did not
    /// belong to the entity, or if the query cannot run.
    pub fn as_list(self) -> CoreResult<Vec<M>> {
        self.query.execute()
    }

    /// The SQL text and bound parameters.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownField`] if an attribute did not
    /// belong to the entity.
    pub fn to_sql(self) -> CoreResult<(String, Vec<SqlValue>)> {
        self.query.finish()
    }
}

impl<M> fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("table", &self.table)
            .field("predicate", &self.predicate)
            .field("params", &self.params)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl<M> fmt::Debug for Where<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Where").field(&self.query).finish()
    }
}

impl<M, T> fmt::Debug for Compare<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Compare").field(&self.query).finish()
    }
}

impl<M> fmt::Debug for Junction<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Junction").field(&self.query).finish()
    }
}
