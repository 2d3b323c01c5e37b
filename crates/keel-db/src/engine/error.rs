//! # Engine Error Types
//!
//! One error enum per engine operation, carrying enough detail for the
//! caller to correct the input and retry.
//!
//! ## Error Classes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Validation     bad input shape (empty cart, quantity out of range)    │
//! │                 → rejected before any database work                     │
//! │                                                                         │
//! │  Consistency    input conflicts with committed state (unknown SKU,     │
//! │                 insufficient stock) → rolled back, never retryable     │
//! │                 as-is; the payload says what to fix                     │
//! │                                                                         │
//! │  Infrastructure wrapped DbError; is_retryable() says whether the       │
//! │                 same call may simply be tried again                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::error::DbError;
use keel_core::{AdjustmentReason, ValidationError};

/// Checkout failures. Any variant other than a successful receipt means
/// the database is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout of an empty cart.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// A line failed shape validation (quantity out of range, bad SKU).
    #[error("Invalid cart line: {0}")]
    InvalidLine(#[from] ValidationError),

    /// A requested SKU does not exist or is inactive.
    #[error("Unknown or inactive product: {sku}")]
    UnknownSku { sku: String },

    /// The attributed employee does not exist.
    #[error("Unknown employee: {employee_id}")]
    UnknownEmployee { employee_id: i64 },

    /// The selected customer does not exist.
    #[error("Unknown customer: {customer_id}")]
    UnknownCustomer { customer_id: i64 },

    /// Not enough stock for a line. `available` is the level observed
    /// inside the failed transaction, so the caller can offer it.
    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: String,
        requested: i64,
        available: i64,
    },

    /// Storage-layer failure.
    #[error(transparent)]
    Store(#[from] DbError),
}

impl CheckoutError {
    /// True only for infrastructure failures where the identical call
    /// may be retried without changing the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Store(e) if e.is_retryable())
    }
}

/// Manual stock adjustment failures.
#[derive(Debug, Error)]
pub enum AdjustmentError {
    /// Delta of zero adjusts nothing.
    #[error("Adjustment delta must be non-zero")]
    ZeroDelta,

    /// `sale` and `purchase` ledger rows are written only by the
    /// checkout and receiving paths.
    #[error("Reason '{0:?}' is reserved for engine-written ledger rows")]
    ReservedReason(AdjustmentReason),

    /// The SKU does not exist.
    #[error("Unknown product: {sku}")]
    UnknownSku { sku: String },

    /// The attributed employee does not exist.
    #[error("Unknown employee: {employee_id}")]
    UnknownEmployee { employee_id: i64 },

    /// The delta would drive stock below zero.
    #[error("Adjustment of {delta} would drive {sku} negative (stock {stock})")]
    WouldGoNegative { sku: String, stock: i64, delta: i64 },

    /// Storage-layer failure.
    #[error(transparent)]
    Store(#[from] DbError),
}

impl AdjustmentError {
    /// See [`CheckoutError::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdjustmentError::Store(e) if e.is_retryable())
    }
}

/// Purchase receiving failures.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// Receiving with no lines.
    #[error("Cannot receive a purchase with no lines")]
    EmptyPurchase,

    /// A line failed shape validation.
    #[error("Invalid purchase line: {0}")]
    InvalidLine(#[from] ValidationError),

    /// A received SKU does not exist.
    #[error("Unknown product: {sku}")]
    UnknownSku { sku: String },

    /// The supplier does not exist.
    #[error("Unknown supplier: {supplier_id}")]
    UnknownSupplier { supplier_id: i64 },

    /// The attributed employee does not exist.
    #[error("Unknown employee: {employee_id}")]
    UnknownEmployee { employee_id: i64 },

    /// Storage-layer failure.
    #[error(transparent)]
    Store(#[from] DbError),
}

impl PurchaseError {
    /// See [`CheckoutError::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, PurchaseError::Store(e) if e.is_retryable())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_infrastructure_is_retryable() {
        assert!(CheckoutError::Store(DbError::Busy("locked".into())).is_retryable());
        assert!(!CheckoutError::Store(DbError::CheckViolation {
            message: "stock".into()
        })
        .is_retryable());

        assert!(!CheckoutError::InsufficientStock {
            sku: "COKE-330".into(),
            requested: 5,
            available: 3,
        }
        .is_retryable());
        assert!(!AdjustmentError::WouldGoNegative {
            sku: "COKE-330".into(),
            stock: 2,
            delta: -5,
        }
        .is_retryable());
        assert!(PurchaseError::Store(DbError::PoolExhausted).is_retryable());
    }
}
