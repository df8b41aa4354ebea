//! Infrastructure layer: configuration and the hosted store/auth backends.

pub mod auth;
pub mod config;
pub mod rest;


pub use auth::RestSessionGate;
pub use config::{ConfigError, StoreConfig};
pub use rest::RestPersistence;
