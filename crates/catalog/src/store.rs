//! Catalog operations over the persistence collaborator.

use rust_decimal::Decimal;

use fieldquote_auth::Session;
use fieldquote_core::money::price_or_zero;
use fieldquote_core::store::{from_row, patch, to_row};
use fieldquote_core::{
    CatalogItemId, Direction, DomainError, DomainResult, Persistence, Query, Table,
};

use crate::item::{CatalogItem, NewItemRow, sort_by_name};

const ENTITY: &str = "catalog item";

/// Catalog of priced items, backed by the `items` table.
#[derive(Debug, Clone)]
pub struct CatalogStore<P> {
    store: P,
}

impl<P: Persistence> CatalogStore<P> {
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// All catalog items, sorted by name ascending. No side effects.
    pub async fn list(&self, session: &Session) -> DomainResult<Vec<CatalogItem>> {
        session.admit()?;
        let rows = self
            .store
            .read(Table::Items, Query::all().order_by("name", Direction::Asc))
            .await
            .map_err(|e| DomainError::persistence("list catalog items", e))?;

        let mut items = rows
            .into_iter()
            .map(from_row::<CatalogItem>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DomainError::persistence("decode catalog items", e))?;
        sort_by_name(&mut items);

        tracing::debug!(count = items.len(), "listed catalog items");
        Ok(items)
    }

    /// Look up an item by its exact (trimmed) name.
    pub async fn find_by_name(
        &self,
        session: &Session,
        name: &str,
    ) -> DomainResult<Option<CatalogItem>> {
        session.admit()?;
        let rows = self
            .store
            .read(Table::Items, Query::all().eq("name", name.trim()))
            .await
            .map_err(|e| DomainError::persistence("look up catalog item", e))?;

        rows.into_iter()
            .next()
            .map(from_row::<CatalogItem>)
            .transpose()
            .map_err(|e| DomainError::persistence("decode catalog item", e))
    }

    /// Add an item. The name is trimmed and must be non-empty and unused;
    /// an absent or negative price becomes zero.
    pub async fn add(
        &self,
        session: &Session,
        name: &str,
        unit_price: Option<Decimal>,
    ) -> DomainResult<CatalogItem> {
        session.admit()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if self.find_by_name(session, name).await?.is_some() {
            return Err(DomainError::validation(format!(
                "catalog item '{name}' already exists"
            )));
        }

        let record = to_row(&NewItemRow {
            name,
            unit_price: price_or_zero(unit_price),
        })
        .map_err(|e| DomainError::persistence("encode catalog item", e))?;

        let row = self
            .store
            .create(Table::Items, record)
            .await
            .map_err(|e| DomainError::persistence(format!("add catalog item '{name}'"), e))?;
        let item: CatalogItem =
            from_row(row).map_err(|e| DomainError::persistence("decode catalog item", e))?;

        tracing::info!(item_id = %item.id, name = %item.name, "catalog item added");
        Ok(item)
    }

    /// Overwrite an item's price. No range validation: any decimal is stored.
    pub async fn update_price(
        &self,
        session: &Session,
        id: CatalogItemId,
        unit_price: Decimal,
    ) -> DomainResult<CatalogItem> {
        session.admit()?;
        let value = serde_json::to_value(unit_price)
            .map_err(|e| DomainError::validation(format!("unit price: {e}")))?;

        let row = self
            .store
            .update(Table::Items, id.get(), patch("unit_price", value))
            .await
            .map_err(|e| DomainError::from_store(ENTITY, format!("update price of item {id}"), e))?;
        let item: CatalogItem =
            from_row(row).map_err(|e| DomainError::persistence("decode catalog item", e))?;

        tracing::info!(item_id = %id, unit_price = %item.unit_price, "catalog price updated");
        Ok(item)
    }

    /// Delete an item. Material lines that copied its name/price are untouched.
    pub async fn remove(&self, session: &Session, id: CatalogItemId) -> DomainResult<()> {
        session.admit()?;
        self.store
            .delete(Table::Items, id.get())
            .await
            .map_err(|e| DomainError::from_store(ENTITY, format!("remove item {id}"), e))?;

        tracing::info!(item_id = %id, "catalog item removed");
        Ok(())
    }
}
