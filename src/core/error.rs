//! Error types for the engine

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tariff: {0}")]
    InvalidTariff(String),

    #[error("Consultant {consultant_id} has no commercial profile assigned")]
    NoProfile { consultant_id: i64 },

    #[error("No active principal commission configured")]
    NoPrincipalCommission,

    #[error("Unknown tariff: {0}")]
    UnknownTariff(i64),

    #[error("Unknown comparison: {0}")]
    UnknownComparison(i64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
