//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and invalid state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid record identifier
    #[error("Invalid record id: {0}")]
    InvalidRecordId(String),

    /// Invalid entity kind name
    #[error("Invalid entity kind: {0}")]
    InvalidEntityKind(String),

    /// Invalid token scope
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidRecordId(String::new());
        assert_eq!(err.to_string(), "Invalid record id: ");

        let err = DomainError::InvalidEntityKind("Not Valid".to_string());
        assert_eq!(err.to_string(), "Invalid entity kind: Not Valid");

        let err = DomainError::InvalidState {
            from: "Completed".to_string(),
            to: "Pending".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Completed to Pending"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidScope("a".to_string());
        let err2 = DomainError::InvalidScope("a".to_string());
        let err3 = DomainError::InvalidScope("b".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
