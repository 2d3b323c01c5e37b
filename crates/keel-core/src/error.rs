//! # Error Types
//!
//! Validation errors for keel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                    │
//! │                                                                         │
//! │  keel-core errors (this file)                                           │
//! │  └── ValidationError  - Input shape failures, detected pre-write        │
//! │                                                                         │
//! │  keel-db errors (separate crate)                                        │
//! │  ├── DbError          - Store/infrastructure failures                   │
//! │  ├── CheckoutError    - Checkout consistency + validation failures      │
//! │  ├── AdjustmentError  - Manual ledger adjustment failures               │
//! │  └── PurchaseError    - Purchase receiving failures                     │
//! │                                                                         │
//! │  Flow: ValidationError → engine error → caller                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, quantity, ...)
//! 3. Errors are enum variants, never String

use thiserror::Error;

/// Input validation errors.
///
/// These occur when input doesn't meet requirements and are detected
/// before any durable write; a failed validation never touches the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad characters in a SKU, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Cart operation referenced a SKU that is not in the cart.
    #[error("SKU '{sku}' is not in the cart")]
    NotInCart { sku: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = ValidationError::NotInCart {
            sku: "COKE-330".to_string(),
        };
        assert_eq!(err.to_string(), "SKU 'COKE-330' is not in the cart");
    }
}
