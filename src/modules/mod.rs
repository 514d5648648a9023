//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the region store contract and its PostgreSQL and in-memory adapters.

pub mod store;
