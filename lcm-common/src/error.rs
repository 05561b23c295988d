//! Common error types for LCM services

use thiserror::Error;

/// Result alias used by the store and configuration layers
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the LCM crates
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite access failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML could not be parsed
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Missing or unusable configuration (credentials, paths)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Assembly or line item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied data that violates a line item or assembly invariant
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored row could not be decoded (bad UUID, timestamp, status text)
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
