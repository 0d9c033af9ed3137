//! Error types for marketplace operations.

use database::{DatabaseError, ValidationError};
use thiserror::Error;

use crate::status::SessionStatus;

/// Errors that can occur while applying marketplace rules.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Request failed input validation.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Record not found, or not visible to the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The status machine does not allow this move.
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// A concurrent write won, or the record already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A session is indexed for one participant but not the other.
    #[error("session {session_id} has no entry for participant {user_id}")]
    MissingCounterpart { session_id: String, user_id: String },

    /// Storage failure.
    #[error("database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for MarketplaceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => MarketplaceError::NotFound { entity, id },
            DatabaseError::AlreadyExists { entity, id } => {
                MarketplaceError::Conflict(format!("{entity} already exists: {id}"))
            }
            DatabaseError::MissingCounterpart {
                session_id,
                user_id,
            } => MarketplaceError::MissingCounterpart {
                session_id,
                user_id,
            },
            other => MarketplaceError::Database(other),
        }
    }
}

impl From<ValidationError> for MarketplaceError {
    fn from(err: ValidationError) -> Self {
        MarketplaceError::Validation(err.to_string())
    }
}

/// Result type for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketplaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_keep_their_meaning() {
        let err: MarketplaceError = DatabaseError::NotFound {
            entity: "Session",
            id: "s1".to_string(),
        }
        .into();
        assert!(matches!(err, MarketplaceError::NotFound { entity: "Session", .. }));

        let err: MarketplaceError = DatabaseError::AlreadyExists {
            entity: "User",
            id: "u1".to_string(),
        }
        .into();
        assert!(matches!(err, MarketplaceError::Conflict(_)));

        let err: MarketplaceError = DatabaseError::MissingCounterpart {
            session_id: "s1".to_string(),
            user_id: "u2".to_string(),
        }
        .into();
        assert!(matches!(err, MarketplaceError::MissingCounterpart { .. }));
    }

    #[test]
    fn test_validation_message_is_preserved() {
        let err: MarketplaceError = ValidationError::Empty("title".to_string()).into();
        assert_eq!(err.to_string(), "invalid input: title cannot be empty");
    }
}
