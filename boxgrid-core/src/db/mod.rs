//! Database layer for boxgrid
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - A transactional log-plus-grid write for activity completions

pub mod repo;
pub mod schema;

pub use repo::Database;
