//! # boxgrid-core
//!
//! Core library for boxgrid - a grid-based habit tracker.
//!
//! This library provides:
//! - Domain types for activities, daily grids, and activity logs
//! - Database storage layer with SQLite
//! - Streak, completion-rate, and weekly-report analytics
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data lives in two layers:
//! - **Canonical:** activities, per-date grids, and the append-only
//!   activity log, kept consistent by the transactional
//!   [`Database::log_activity`]
//! - **Derived:** user analytics rollups, weekly reports, and activity
//!   patterns - recomputed on demand and overwritten wholesale
//!
//! ## Example
//!
//! ```rust,no_run
//! use boxgrid_core::{Activity, Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let activity = Activity::new("user-1", "Read");
//! db.upsert_activity(&activity).expect("failed to save activity");
//! let today = chrono::Utc::now().date_naive();
//! db.log_activity("user-1", &activity.id, today, 0, "", config.grid.default_grid_size)
//!     .expect("failed to log");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
