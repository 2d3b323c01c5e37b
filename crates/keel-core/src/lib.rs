//! # keel-core: Pure Business Logic for Keel POS
//!
//! This crate is the **heart** of Keel POS. It contains all business rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Keel POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              UI shell / reporting / exporters                   │   │
//! │  │                  (external collaborators)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ keel-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │   alert   │   │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │   rules   │   │   │
//! │  │   │   Sale    │  │  (cents)  │  │ CartLine  │  │  events   │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   keel-db (Database Layer)                      │   │
//! │  │      SQLite store, repositories, checkout transaction engine    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Receipt, ledger entries, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Caller-owned in-memory cart
//! - [`alert`] - Post-commit alert rule evaluation
//! - [`error`] - Validation error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64) to avoid
//!    float errors
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alert;
pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use alert::{
    AlertEvaluator, AlertEvent, AlertThresholds, LargeTransactionAlert, LowStockAlert,
    StockSnapshot,
};
pub use cart::{Cart, CartLine};
pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Reserved identity of the anonymous ("cash") customer.
///
/// ## Why a constant?
/// Sales with no selected customer default to this row. The row is
/// seeded by migration before first use and can never be deleted; a
/// named constant keeps the sentinel out of call sites.
pub const ANONYMOUS_CUSTOMER_ID: i64 = 0;

/// Maximum distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default per-product low-stock threshold, in units.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 25;
