//! Error types for the commerce core

use thiserror::Error;

/// Commerce-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommerceError {
    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Order request carried no line items.
    #[error("order contains no items")]
    EmptyOrder,

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind (product, variant, inventory, order, coupon, deal).
        kind: &'static str,
        /// Identifier that failed to resolve.
        id:   String,
    },

    /// State conflict: duplicate code, overlapping deal window, terminal
    /// status transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Computed availability below the requested quantity.
    #[error("insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Product short on stock.
        product_id: String,
        /// Variant, when the shortfall is variant-level.
        variant_id: Option<String>,
        /// Quantity still available.
        available:  u32,
        /// Quantity requested.
        requested:  u32,
    },

    /// Line items disagree on currency and no order currency was given.
    #[error("currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch {
        /// Currency seen first.
        expected: String,
        /// Conflicting currency.
        got:      String,
    },

    /// Transaction exceeded its deadline. Nothing was committed.
    #[error("transaction timed out")]
    TransactionTimeout,

    /// Caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommerceError {
    /// Whether the caller may safely retry the operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionTimeout)
    }

    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}

/// Result type for commerce operations.
pub type CommerceResult<T> = Result<T, CommerceError>;
