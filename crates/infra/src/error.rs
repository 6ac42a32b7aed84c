//! Service-level error model.

use thiserror::Error;

use stockyard_core::DomainError;

use crate::store::StoreError;

/// Failure of a service operation.
///
/// Domain errors pass through unchanged; store errors are split into the
/// retryable concurrency case and everything else.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic concurrency failure (stale aggregate version). Re-fetch and retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Publication failed after a successful commit (the change is durable).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency { .. } => ServiceError::Concurrency(value.to_string()),
            StoreError::UniqueViolation(msg) => ServiceError::Domain(DomainError::Validation(msg)),
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Domain(e) => e.is_retryable(),
            ServiceError::Concurrency(_) => true,
            _ => false,
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stockyard_core::{AggregateId, ExpectedVersion};

    #[test]
    fn store_concurrency_is_retryable() {
        let err = ServiceError::from(StoreError::Concurrency {
            aggregate_type: "inventory.lot",
            aggregate_id: AggregateId::new(),
            expected: ExpectedVersion::Exact(1),
            actual: Some(2),
        });
        assert!(matches!(err, ServiceError::Concurrency(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn duplicate_code_surfaces_as_validation() {
        let err = ServiceError::from(StoreError::UniqueViolation("code taken".into()));
        assert_eq!(err.domain(), Some(&DomainError::Validation("code taken".into())));
        assert!(!err.is_retryable());
    }
}
