//! In-memory persistence for tests/dev.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use serde_json::Value;

use super::{Direction, ID_COLUMN, Persistence, Query, Row, StoreError, Table};

#[derive(Debug, Default)]
struct State {
    tables: HashMap<Table, BTreeMap<i64, Row>>,
    last_ids: HashMap<Table, i64>,
    failing: HashSet<Table>,
    write_attempts: HashMap<Table, usize>,
}

impl State {
    /// Count the write attempt, then refuse it if the table is marked failing.
    fn begin_write(&mut self, table: Table) -> Result<(), StoreError> {
        *self.write_attempts.entry(table).or_default() += 1;
        if self.failing.contains(&table) {
            return Err(StoreError::Unavailable(format!(
                "writes to {table} are failing"
            )));
        }
        Ok(())
    }

    fn insert(&mut self, table: Table, mut record: Row) -> Row {
        let next = self.last_ids.entry(table).or_default();
        *next += 1;
        let id = *next;
        record.insert(ID_COLUMN.to_string(), Value::from(id));
        self.tables.entry(table).or_default().insert(id, record.clone());
        record
    }
}

/// In-memory store with store-assigned ids.
///
/// - Ids start at 1 per table and are never reused
/// - `create_many` is all-or-nothing
/// - Writes to a table can be made to fail (`fail_writes`) to exercise
///   persistence-failure paths
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `table` fail with `Unavailable`.
    pub fn fail_writes(&self, table: Table) {
        if let Ok(mut state) = self.inner.write() {
            state.failing.insert(table);
        }
    }

    /// Undo [`InMemoryStore::fail_writes`].
    pub fn heal(&self, table: Table) {
        if let Ok(mut state) = self.inner.write() {
            state.failing.remove(&table);
        }
    }

    /// Number of write calls (successful or not) made against `table`.
    pub fn write_attempts(&self, table: Table) -> usize {
        self.inner
            .read()
            .map(|s| s.write_attempts.get(&table).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Snapshot of a table's rows in id order.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.inner
            .read()
            .map(|s| {
                s.tables
                    .get(&table)
                    .map(|t| t.values().cloned().collect::<Vec<Row>>())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl Persistence for InMemoryStore {
    async fn create(&self, table: Table, record: Row) -> Result<Row, StoreError> {
        let mut state = self.write_state()?;
        state.begin_write(table)?;
        Ok(state.insert(table, record))
    }

    async fn create_many(&self, table: Table, records: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        let mut state = self.write_state()?;
        state.begin_write(table)?;
        Ok(records
            .into_iter()
            .map(|record| state.insert(table, record))
            .collect())
    }

    async fn read(&self, table: Table, query: Query) -> Result<Vec<Row>, StoreError> {
        let state = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))?;

        let mut rows: Vec<Row> = state
            .tables
            .get(&table)
            .map(|t| t.values().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = query.order() {
            // Stable sort: ties keep id order.
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        Ok(rows)
    }

    async fn update(&self, table: Table, id: i64, patch: Row) -> Result<Row, StoreError> {
        let mut state = self.write_state()?;
        state.begin_write(table)?;
        let row = state
            .tables
            .get_mut(&table)
            .and_then(|t| t.get_mut(&id))
            .ok_or(StoreError::NotFound { table, id })?;

        for (column, value) in patch {
            if column != ID_COLUMN {
                row.insert(column, value);
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: Table, id: i64) -> Result<(), StoreError> {
        let mut state = self.write_state()?;
        state.begin_write(table)?;
        state
            .tables
            .get_mut(&table)
            .and_then(|t| t.remove(&id))
            .map(|_| ())
            .ok_or(StoreError::NotFound { table, id })
    }
}

/// Total order over JSON scalars: null < bool < number < string < other.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::to_row;
    use serde_json::json;

    fn row(value: Value) -> Row {
        to_row(&value).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_per_table() {
        let store = InMemoryStore::new();
        let a = store.create(Table::Items, row(json!({"name": "Pipe"}))).await.unwrap();
        let b = store.create(Table::Items, row(json!({"name": "Screw"}))).await.unwrap();
        let c = store.create(Table::Customers, row(json!({"name": "Jan"}))).await.unwrap();

        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert_eq!(c["id"], json!(1));
    }

    #[tokio::test]
    async fn read_filters_and_orders() {
        let store = InMemoryStore::new();
        for (customer, item) in [(1, "b"), (2, "x"), (1, "a"), (1, "c")] {
            store
                .create(Table::Materials, row(json!({"customer_id": customer, "item": item})))
                .await
                .unwrap();
        }

        let rows = store
            .read(
                Table::Materials,
                Query::all().eq("customer_id", 1).order_by("item", Direction::Desc),
            )
            .await
            .unwrap();

        let items: Vec<_> = rows.iter().map(|r| r["item"].clone()).collect();
        assert_eq!(items, vec![json!("c"), json!("b"), json!("a")]);
    }

    #[tokio::test]
    async fn update_merges_patch_but_never_the_id() {
        let store = InMemoryStore::new();
        store
            .create(Table::Items, row(json!({"name": "Pipe", "unit_price": "2.50"})))
            .await
            .unwrap();

        let updated = store
            .update(Table::Items, 1, row(json!({"id": 99, "unit_price": "3.00"})))
            .await
            .unwrap();

        assert_eq!(updated["id"], json!(1));
        assert_eq!(updated["name"], json!("Pipe"));
        assert_eq!(updated["unit_price"], json!("3.00"));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.update(Table::Items, 5, Row::new()).await.unwrap_err(),
            StoreError::NotFound { table: Table::Items, id: 5 }
        );
        assert_eq!(
            store.delete(Table::Items, 5).await.unwrap_err(),
            StoreError::NotFound { table: Table::Items, id: 5 }
        );
    }

    #[tokio::test]
    async fn failing_table_rejects_whole_batch_and_counts_attempts() {
        let store = InMemoryStore::new();
        store.fail_writes(Table::Materials);

        let err = store
            .create_many(
                Table::Materials,
                vec![row(json!({"item": "a"})), row(json!({"item": "b"}))],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.rows(Table::Materials).is_empty());
        assert_eq!(store.write_attempts(Table::Materials), 1);

        store.heal(Table::Materials);
        let rows = store
            .create_many(Table::Materials, vec![row(json!({"item": "a"}))])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn null_sorts_before_values() {
        assert_eq!(compare_values(&Value::Null, &json!("2024-01-01")), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!(9.5)), Ordering::Greater);
    }
}
