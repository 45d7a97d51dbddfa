//! Error types for boxgrid-core

use thiserror::Error;

/// Main error type for the boxgrid-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Grid position outside [0, grid_size)
    #[error("invalid grid position {position} for grid of size {grid_size}")]
    InvalidPosition { position: u32, grid_size: u32 },

    /// Referenced activity does not exist, is inactive, or belongs to another user
    #[error("activity not found: {0}")]
    ActivityNotFound(String),

    /// Malformed value in a stored column
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type alias for boxgrid-core
pub type Result<T> = std::result::Result<T, Error>;
