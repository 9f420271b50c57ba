//! # Persistence Errors
//!
//! Error types for the persistence layer, wrapping sqlx and IO errors.

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A guarded update matched no row: someone else changed it first.
    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    // === Audit log errors ===
    #[error("Event store IO error: {0}")]
    EventStoreIo(#[from] std::io::Error),

    #[error("Event serialization error: {0}")]
    EventSerialization(#[from] serde_json::Error),

    // === Conversion errors ===
    #[error("Invalid decimal value in {field}: {value}")]
    InvalidDecimal { field: String, value: String },

    #[error("Invalid row: {0}")]
    InvalidRow(#[from] paybank_core::CoreError),
}

/// Result type alias for PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &str, id: &str) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_helpers() {
        let err = PersistenceError::not_found("Account", "ACC_1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Record not found: Account with id ACC_1");

        let err = PersistenceError::conflict("Account", "ACC_1");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }
}
