//! `fieldquote-core`: domain foundation building blocks.
//!
//! Identifiers, the domain error model, money helpers and the persistence
//! contract that the catalog and quote engines are written against.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod store;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CatalogItemId, CustomerId, MaterialLineId, UserId};
pub use store::{Direction, InMemoryStore, Persistence, Query, Row, StoreError, Table};
