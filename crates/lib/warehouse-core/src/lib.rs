//! Core types and services for warehouse-mcp.
//!
//! This crate turns warehouse metadata into agent-readable table descriptions,
//! assembles the startup overview, runs read-only queries against the
//! warehouse, and talks to the notebook-entry and `PubMed` HTTP APIs. The
//! control plane ties these together behind one handle per server.

pub mod clients;
pub mod control;
pub mod describe;
pub mod overview;
pub mod parsers;
pub mod store;
