//! Domain error types.

use common::PetId;
use ledger::LedgerError;
use thiserror::Error;

use crate::encryption::EncryptionError;

/// Bad input shape, reported before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed for {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Some, but not all, requested pets could be sold.
///
/// Carried next to a persisted order rather than in the `Err` channel: the
/// order for the fulfilled pets exists and the caller needs both.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Partial fulfillment: {} pet(s) unavailable: {}", .rejected.len(), join_ids(.rejected))]
pub struct PartialFulfillmentError {
    pub rejected: Vec<PetId>,
}

fn join_ids(ids: &[PetId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request was well formed but cannot be honoured.
    #[error("Business rule violated: {0}")]
    BusinessRule(String),

    /// A referenced record does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The request conflicts with the current state of a record.
    #[error("Conflict on {resource}: {message}")]
    Conflict {
        resource: &'static str,
        message: String,
    },

    /// A protected field could not be encrypted or decrypted.
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// The inventory ledger failed; any open transaction was rolled back.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl DomainError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(resource: &'static str, message: impl Into<String>) -> Self {
        DomainError::Conflict {
            resource,
            message: message.into(),
        }
    }

    /// Returns true when the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Ledger(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_fulfillment_lists_rejected_ids() {
        let a = PetId::new();
        let b = PetId::new();
        let err = PartialFulfillmentError {
            rejected: vec![a, b],
        };

        let message = err.to_string();
        assert!(message.contains("2 pet(s)"));
        assert!(message.contains(&a.to_string()));
        assert!(message.contains(&b.to_string()));
    }

    #[test]
    fn only_transient_ledger_failures_are_retryable() {
        assert!(DomainError::Ledger(LedgerError::Timeout("lock".into())).is_retryable());
        assert!(DomainError::Ledger(LedgerError::Contention("deadlock".into())).is_retryable());
        assert!(!DomainError::Ledger(LedgerError::Corrupt("row".into())).is_retryable());
        assert!(!DomainError::BusinessRule("none".into()).is_retryable());
        assert!(!DomainError::not_found("order", "x").is_retryable());
    }

    #[test]
    fn validation_error_names_field() {
        let err: DomainError = ValidationError::new("pet_ids", "too many").into();
        assert_eq!(err.to_string(), "Validation failed for pet_ids: too many");
    }
}
