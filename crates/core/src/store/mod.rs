//! Persistence contract consumed by the catalog and quote engines.
//!
//! The engines never see how rows are stored. They talk to a [`Persistence`]
//! implementation in terms of three tables and JSON rows whose field names are
//! the persisted-record contract:
//!
//! ```text
//! customers {id, name, email, phone, address, install_date}
//! materials {id, customer_id, item, qty, unit_price, ordered}
//! items     {id, name, unit_price}
//! ```
//!
//! Row ids are always assigned by the store.

pub mod in_memory;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use in_memory::InMemoryStore;

/// A persisted record: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Name of the id column shared by every table.
pub const ID_COLUMN: &str = "id";

/// Tables the domain reads and writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Table {
    Customers,
    Materials,
    Items,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Customers => "customers",
            Table::Materials => "materials",
            Table::Items => "items",
        }
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

/// Single-column ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Read request: conjunction of equality filters plus an optional order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    filters: Vec<Filter>,
    order: Option<Order>,
}

impl Query {
    /// Every row of the table, in store order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only rows where `column == value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Whether `row` satisfies every filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|f| row.get(&f.column).unwrap_or(&Value::Null) == &f.value)
    }
}

/// Persistence collaborator failure.
///
/// These are infrastructure errors; the engines wrap them into
/// [`crate::DomainError`] together with the intent of the failed call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row with the given id exists.
    #[error("no {table} row with id {id}")]
    NotFound { table: Table, id: i64 },

    /// The store refused the request (constraint violation, bad column, ...).
    #[error("store rejected the request: {0}")]
    Rejected(String),

    /// The store could not be reached or failed internally.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row could not be converted to or from its domain record.
    #[error("malformed row: {0}")]
    Decode(String),
}

/// Minimal CRUD capability set over the three domain tables.
///
/// Implementations must assign ids on create, return the stored row (with its
/// id) from `create`/`update`, and report a missing id as
/// [`StoreError::NotFound`] from `update`/`delete`.
#[async_trait::async_trait]
pub trait Persistence: Send + Sync {
    /// Insert one row and return it with its store-assigned id.
    async fn create(&self, table: Table, record: Row) -> Result<Row, StoreError>;

    /// Insert several rows as one atomic unit: either all are stored or none.
    async fn create_many(&self, table: Table, records: Vec<Row>) -> Result<Vec<Row>, StoreError>;

    async fn read(&self, table: Table, query: Query) -> Result<Vec<Row>, StoreError>;

    /// Merge `patch` into the row with `id` and return the updated row.
    async fn update(&self, table: Table, id: i64, patch: Row) -> Result<Row, StoreError>;

    async fn delete(&self, table: Table, id: i64) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<P> Persistence for Arc<P>
where
    P: Persistence + ?Sized,
{
    async fn create(&self, table: Table, record: Row) -> Result<Row, StoreError> {
        (**self).create(table, record).await
    }

    async fn create_many(&self, table: Table, records: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        (**self).create_many(table, records).await
    }

    async fn read(&self, table: Table, query: Query) -> Result<Vec<Row>, StoreError> {
        (**self).read(table, query).await
    }

    async fn update(&self, table: Table, id: i64, patch: Row) -> Result<Row, StoreError> {
        (**self).update(table, id, patch).await
    }

    async fn delete(&self, table: Table, id: i64) -> Result<(), StoreError> {
        (**self).delete(table, id).await
    }
}

/// Serialize a record (or patch struct) into a row.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Decode(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

/// Deserialize a row into its domain record.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Read the store-assigned id of a row.
pub fn row_id(row: &Row) -> Option<i64> {
    row.get(ID_COLUMN).and_then(Value::as_i64)
}

/// Build a one-column patch.
pub fn patch(column: &str, value: impl Into<Value>) -> Row {
    let mut row = Row::new();
    row.insert(column.to_string(), value.into());
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_matches_all_equality_filters() {
        let query = Query::all().eq("customer_id", 3).eq("ordered", false);
        let row = to_row(&json!({"id": 1, "customer_id": 3, "ordered": false})).unwrap();
        let other = to_row(&json!({"id": 2, "customer_id": 4, "ordered": false})).unwrap();

        assert!(query.matches(&row));
        assert!(!query.matches(&other));
    }

    #[test]
    fn missing_column_only_matches_null() {
        let row = to_row(&json!({"id": 1})).unwrap();
        assert!(Query::all().eq("install_date", Value::Null).matches(&row));
        assert!(!Query::all().eq("install_date", "2024-05-01").matches(&row));
    }

    #[test]
    fn to_row_rejects_non_objects() {
        assert!(matches!(to_row(&42), Err(StoreError::Decode(_))));
    }
}
