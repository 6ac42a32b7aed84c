//! Domain error model.

use thiserror::Error;

use crate::id::AggregateId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only (validation, state machine guards, stock
/// shortfalls). Storage failures live in `stockyard-infra`.
///
/// Every variant carries enough context (ids, line index, requested vs available
/// quantity) for a caller to render a user-facing message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A state machine guard was violated.
    #[error("cannot {action} {entity} {id} in status {from}")]
    InvalidTransition {
        entity: &'static str,
        id: AggregateId,
        from: &'static str,
        action: &'static str,
    },

    /// A movement order was submitted without lines.
    #[error("order must contain at least one line")]
    EmptyOrder,

    /// A quantity was zero or negative where a positive one is required.
    #[error("invalid quantity {quantity} at line {line_index}")]
    InvalidQuantity { line_index: usize, quantity: i64 },

    /// The selected lot cannot cover the requested quantity.
    #[error("lot {lot_id} has {available} remaining, {requested} requested")]
    InsufficientLotQuantity {
        lot_id: AggregateId,
        requested: i64,
        available: i64,
    },

    /// Confirming an order failed because a lot was depleted underneath it.
    #[error(
        "order {order_id} line {line_index}: lot {lot_id} has {available}, {requested} requested"
    )]
    StockConflict {
        order_id: AggregateId,
        line_index: usize,
        lot_id: AggregateId,
        requested: i64,
        available: i64,
    },

    /// A return would push a lot above its received quantity.
    #[error(
        "returning {requested} to lot {lot_id} exceeds receipt ({remaining} of {received} left)"
    )]
    OverReturn {
        lot_id: AggregateId,
        requested: i64,
        remaining: i64,
        received: i64,
    },

    /// An inventory check still has lines without a counted quantity.
    #[error("inventory check {check_id} has {} uncounted line(s)", missing.len())]
    IncompleteCheck {
        check_id: AggregateId,
        missing: Vec<AggregateId>,
    },

    /// A product reference is not part of the order/check.
    #[error("product {product_id} is not part of {id}")]
    UnknownLineItem {
        id: AggregateId,
        product_id: AggregateId,
    },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A stale version was detected (optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Whether re-fetching and retrying the operation may succeed.
    ///
    /// Stock shortfalls and version conflicts are races with other writers;
    /// `OverReturn` signals upstream inconsistency and is not retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientLotQuantity { .. } | Self::StockConflict { .. } | Self::Conflict(_)
        )
    }
}
