//! Error types for adapter operations

use thiserror::Error;

/// Error raised by an adapter or provisioner while serving the query contract
#[derive(Error, Debug)]
pub enum QcertError {
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Unknown field '{field}' on table '{table}'")]
    UnknownField { table: String, field: String },

    #[error("Type mismatch for '{table}.{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        table: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Missing required field '{field}' on table '{table}'")]
    MissingRequired { table: String, field: String },

    #[error("Duplicate key on '{table}.{field}': {value}")]
    DuplicateKey {
        table: String,
        field: String,
        value: String,
    },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for adapter operations
pub type QcertResult<T> = std::result::Result<T, QcertError>;
