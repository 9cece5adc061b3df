// Library exports for Flavors
// The binary and integration tests both go through these modules.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;

pub use catalog::{Catalog, CatalogOptions, StorageTarget};
pub use error::{StoreError, StoreResult};
