//! Read-only access to the Postgres warehouse.
//!
//! The store owns the connection pool, pins every session to the tenant schema,
//! and converts ad-hoc query results into JSON.

pub mod metadata;
pub mod postgres;
pub mod rows;

pub use postgres::{StoreError, StoreResult, WarehouseStore, WarehouseStoreConfig};
pub use rows::{QueryRows, iso_naive_datetime};
