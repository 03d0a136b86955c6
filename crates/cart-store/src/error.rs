use thiserror::Error;

use crate::{Revision, SessionKey};

/// Errors that can occur when reading or writing stored carts.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// Another writer saved the cart since it was last loaded.
    /// The expected revision did not match the stored one.
    #[error(
        "Revision conflict for cart {session_key}: expected revision {expected}, found {actual}"
    )]
    RevisionConflict {
        session_key: SessionKey,
        expected: Revision,
        actual: Revision,
    },

    /// The backing storage could not be reached.
    #[error("Cart storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartStoreError>;
