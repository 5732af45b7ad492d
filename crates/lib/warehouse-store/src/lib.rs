//! Warehouse metadata models and naming helpers for warehouse-mcp.
//!
//! This crate defines the in-memory picture of a tenant's warehouse schema that
//! the description formatter and the tool layer share, plus the paper records
//! returned by the literature tools.

pub mod literature;
pub mod models;
pub mod schema;

pub use literature::*;
pub use models::*;
