//! Error types for Fear Tracker

use thiserror::Error;

/// Main error type for Fear Tracker operations
///
/// Synchronization passes never surface these to their callers; they are
/// returned by the store and channel seams and by the reposition API.
#[derive(Error, Debug)]
pub enum FearError {
    /// Setting was never registered in the store
    #[error("Setting not registered: {0}")]
    UnregisteredSetting(String),

    /// The store refused the write
    #[error("Write rejected for {0}")]
    WriteRejected(String),

    /// Storage task failed before finishing
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Broadcast channel failure
    #[error("Broadcast error: {0}")]
    Broadcast(String),

    /// Tracker is not mounted on the surface
    #[error("Tracker is not rendered")]
    NotRendered,

    /// Invalid configuration file or value
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FearError {
    fn from(err: serde_json::Error) -> Self {
        FearError::Serialization(err.to_string())
    }
}

/// Result type alias using FearError
pub type FearResult<T> = Result<T, FearError>;
