use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fieldquote_core::{CatalogItemId, Entity};

/// A named, priced material available to every customer's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    pub unit_price: Decimal,
}

impl Entity for CatalogItem {
    type Id = CatalogItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Insert payload for the `items` table (id is store-assigned).
#[derive(Debug, Serialize)]
pub(crate) struct NewItemRow<'a> {
    pub name: &'a str,
    pub unit_price: Decimal,
}

/// Price lookup used when a catalog item is picked for a material line.
///
/// Exact name match; the returned price is copied into the line.
pub fn price_for(items: &[CatalogItem], name: &str) -> Option<Decimal> {
    items.iter().find(|i| i.name == name).map(|i| i.unit_price)
}

/// Catalog ordering: case-insensitive by name, exact name as tie-break.
pub(crate) fn sort_by_name(items: &mut [CatalogItem]) {
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}
