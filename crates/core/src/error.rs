//! Domain error model.

use thiserror::Error;

use crate::id::CustomerId;
use crate::store::StoreError;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every engine operation returns one of these; none of them is fatal to the
/// process. Optimistic local state is never rolled back on the caller's behalf.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input shape (e.g. an empty required name). Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The referenced record is absent from the store.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The persistence collaborator failed while carrying out `intent`.
    #[error("failed to {intent}: {source}")]
    Persistence {
        intent: String,
        #[source]
        source: StoreError,
    },

    /// The customer row was written but its initial material lines were not.
    #[error("customer {customer_id} was created but its material lines were not saved: {source}")]
    PartialCreate {
        customer_id: CustomerId,
        #[source]
        source: StoreError,
    },

    /// No usable session was presented.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn persistence(intent: impl Into<String>, source: StoreError) -> Self {
        Self::Persistence {
            intent: intent.into(),
            source,
        }
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// Map a store failure, turning a missing row into `NotFound` for `entity`.
    pub fn from_store(entity: &'static str, intent: impl Into<String>, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => Self::not_found(entity, id),
            other => Self::persistence(intent, other),
        }
    }

    /// Whether a caller may reasonably retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Persistence {
                source: StoreError::Unavailable(_),
                ..
            } | DomainError::PartialCreate { .. }
        )
    }
}
