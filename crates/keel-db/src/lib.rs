//! # keel-db: Database Layer for Keel POS
//!
//! This crate provides database access and the checkout transaction
//! engine for the Keel POS system. It uses SQLite for local storage
//! with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Keel POS Data Flow                              │
//! │                                                                         │
//! │  Caller (UI session)                                                    │
//! │       │  checkout(cart lines, employee, customer?)                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      keel-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │ CheckoutEngine│    │ Repositories │   │   │
//! │  │   │   (pool.rs)   │    │  (engine/)    │    │ (repository/)│   │   │
//! │  │   │               │    │               │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│ BEGIN IMMEDIATE    │ ProductRepo  │   │   │
//! │  │   │ Migrations    │    │ all-or-nothing│    │ SaleRepo ... │   │   │
//! │  │   └───────────────┘    └──────┬────────┘    └──────────────┘   │   │
//! │  │                               │ post-commit                    │   │
//! │  │                        ┌──────▼────────┐                       │   │
//! │  │                        │  AlertSink    │──► dispatcher (ext.)  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, party, ...)
//! - [`engine`] - Checkout transaction engine, ledger writes, purchases
//! - [`alerts`] - Post-commit alert dispatch seam
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keel_db::{AlertSink, CheckoutEngine, Database, DbConfig};
//! use keel_core::{AlertThresholds, CartLine};
//!
//! let db = Database::new(DbConfig::new("path/to/keel.db")).await?;
//! let (sink, mut alert_rx) = AlertSink::channel();
//! let engine = CheckoutEngine::new(db.clone(), AlertThresholds::default(), sink);
//!
//! let receipt = engine
//!     .checkout(&[CartLine::new("COKE-330", 2)], employee_id, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::AlertSink;
pub use engine::{AdjustmentError, CheckoutEngine, CheckoutError, PurchaseError, PurchaseLine};
pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::adjustment::{AdjustmentRepository, Reconciliation};
pub use repository::party::{CustomerRepository, EmployeeRepository};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
