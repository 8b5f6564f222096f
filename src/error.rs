//! Error types for the cache subsystem
//!
//! Provides unified error handling using thiserror.
//!
//! Errors only surface at construction time (rejected capacity, database
//! open/schema failures). Once a cache is built, every failure inside the
//! lookup and write paths is absorbed and presented as a miss.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache subsystem.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Strong tier constructed with a capacity of zero
    #[error("strong tier capacity must be at least 1")]
    ZeroCapacity,

    /// Persistent store could not be opened or migrated
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Payload could not be serialized for persistence
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache directory could not be created
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;
