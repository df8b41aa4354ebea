//! Shared catalog of priced materials.
//!
//! Catalog items are referenced by material lines through a name/price
//! snapshot only; changing or removing an item never touches existing lines.

pub mod item;
pub mod store;

pub use item::{CatalogItem, price_for};
pub use store::CatalogStore;
